use tracing::debug;

type Tier<'a, T> = Box<dyn Fn() -> Option<T> + 'a>;

/// Ordered fallback tiers: the first tier producing a value wins.
///
/// Tiers are evaluated lazily, so later (more expensive, less precise) tiers
/// never run once an earlier one has answered.
pub struct Cascade<'a, T> {
    label: &'static str,
    tiers: Vec<(&'static str, Tier<'a, T>)>,
}

impl<'a, T> Cascade<'a, T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            tiers: Vec::new(),
        }
    }

    pub fn tier(mut self, name: &'static str, tier: impl Fn() -> Option<T> + 'a) -> Self {
        self.tiers.push((name, Box::new(tier)));
        self
    }

    /// Run tiers in order and return the first result
    pub fn resolve(self) -> Option<T> {
        for (name, tier) in self.tiers {
            if let Some(value) = tier() {
                debug!("{}: resolved by {}", self.label, name);
                return Some(value);
            }
            debug!("{}: {} found nothing", self.label, name);
        }
        None
    }

    /// Run tiers in order, falling back to `default` when every tier is empty
    pub fn resolve_or(self, default: T) -> T {
        let label = self.label;
        self.resolve().unwrap_or_else(|| {
            debug!("{}: using default", label);
            default
        })
    }
}
