use std::fmt;

/// Release-source label found in media and subtitle filenames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseFormat {
    BluRay,
    BrRip,
    BdRip,
    WebDlHyphen,
    WebDl,
    WebRip,
    Web,
    HdRip,
    DvdRip,
    Screener,
    Scr,
    Telesync,
    Ts,
    CamRip,
    Cam,
}

impl ReleaseFormat {
    /// Detection order. Tokens that contain another token as a substring come
    /// first, so `WEB-DL` wins over `WEB` and `CAMRIP` over `CAM`.
    pub const PRIORITY: [ReleaseFormat; 15] = [
        ReleaseFormat::BluRay,
        ReleaseFormat::BrRip,
        ReleaseFormat::BdRip,
        ReleaseFormat::WebDlHyphen,
        ReleaseFormat::WebDl,
        ReleaseFormat::WebRip,
        ReleaseFormat::Web,
        ReleaseFormat::HdRip,
        ReleaseFormat::DvdRip,
        ReleaseFormat::Screener,
        ReleaseFormat::Scr,
        ReleaseFormat::Telesync,
        ReleaseFormat::Ts,
        ReleaseFormat::CamRip,
        ReleaseFormat::Cam,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            ReleaseFormat::BluRay => "BluRay",
            ReleaseFormat::BrRip => "BRRip",
            ReleaseFormat::BdRip => "BDRip",
            ReleaseFormat::WebDlHyphen => "WEB-DL",
            ReleaseFormat::WebDl => "WEBDL",
            ReleaseFormat::WebRip => "WEBRip",
            ReleaseFormat::Web => "WEB",
            ReleaseFormat::HdRip => "HDRip",
            ReleaseFormat::DvdRip => "DVDRip",
            ReleaseFormat::Screener => "SCREENER",
            ReleaseFormat::Scr => "SCR",
            ReleaseFormat::Telesync => "TELESYNC",
            ReleaseFormat::Ts => "TS",
            ReleaseFormat::CamRip => "CAMRIP",
            ReleaseFormat::Cam => "CAM",
        }
    }

    /// Case-insensitive substring test against a filename
    pub fn occurs_in(&self, filename: &str) -> bool {
        contains_ignore_case(filename, self.token())
    }
}

impl fmt::Display for ReleaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// First release format, in priority order, occurring anywhere in `filename`
pub fn extract_format(filename: &str) -> Option<ReleaseFormat> {
    ReleaseFormat::PRIORITY
        .into_iter()
        .find(|format| format.occurs_in(filename))
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_known_formats() {
        assert_eq!(
            extract_format("Movie.2024.HDRip.x264.mkv"),
            Some(ReleaseFormat::HdRip)
        );
        assert_eq!(
            extract_format("Movie.2024.1080p.BluRay.x264.mkv"),
            Some(ReleaseFormat::BluRay)
        );
        assert_eq!(
            extract_format("movie.2024.dvdrip.avi"),
            Some(ReleaseFormat::DvdRip)
        );
    }

    #[test]
    fn test_specific_tokens_win() {
        assert_eq!(
            extract_format("Movie.2024.WEB-DL.1080p.mkv"),
            Some(ReleaseFormat::WebDlHyphen)
        );
        assert_eq!(
            extract_format("Movie.2024.WEBRip.mkv"),
            Some(ReleaseFormat::WebRip)
        );
        assert_eq!(
            extract_format("Movie.2024.CAMRip.avi"),
            Some(ReleaseFormat::CamRip)
        );
        assert_eq!(
            extract_format("Movie.2024.SCREENER.avi"),
            Some(ReleaseFormat::Screener)
        );
    }

    #[test]
    fn test_list_order_breaks_ties() {
        // Both BluRay and WEB occur; BluRay is earlier in the list.
        assert_eq!(
            extract_format("Movie.WEB.BluRay.mkv"),
            Some(ReleaseFormat::BluRay)
        );
    }

    #[test]
    fn test_no_format() {
        assert_eq!(extract_format("Movie.2024.1080p.mkv"), None);
        assert_eq!(extract_format(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ReleaseFormat::WebDlHyphen.to_string(), "WEB-DL");
        assert_eq!(ReleaseFormat::Cam.to_string(), "CAM");
    }
}
