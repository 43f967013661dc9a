use std::collections::HashSet;

/// Decides whether a caveat's condition holds for the current request
///
/// The crate never interprets caveat text itself. Implement this trait to
/// give caveats meaning, then pass it to [`crate::Macaroon::authorize`].
pub trait Satisfier {
    /// Returns true if `caveat` is satisfied
    fn satisfies(&self, caveat: &str) -> bool;
}

/// Any `Fn(&str) -> bool` closure is a satisfier
///
/// # Example
/// ```
/// use pkmacaroon::Satisfier;
///
/// let satisfier = |caveat: &str| caveat.starts_with("scope=");
/// assert!(satisfier.satisfies("scope=read"));
/// assert!(!satisfier.satisfies("expires=2099"));
/// ```
impl<F> Satisfier for F
where
    F: Fn(&str) -> bool,
{
    fn satisfies(&self, caveat: &str) -> bool {
        self(caveat)
    }
}

/// A satisfier that accepts all caveats
///
/// Useful for testing or when you only care about signature verification
pub struct AcceptAll;

impl Satisfier for AcceptAll {
    fn satisfies(&self, _caveat: &str) -> bool {
        true
    }
}

/// A satisfier that rejects all caveats
pub struct RejectAll;

impl Satisfier for RejectAll {
    fn satisfies(&self, _caveat: &str) -> bool {
        false
    }
}

/// Accepts exactly the caveat strings it was given
///
/// # Example
/// ```
/// use pkmacaroon::Satisfier;
/// use pkmacaroon::satisfier::ExactSatisfier;
///
/// let satisfier = ExactSatisfier::new(["account=alice", "action=read"]);
/// assert!(satisfier.satisfies("action=read"));
/// assert!(!satisfier.satisfies("action=write"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExactSatisfier {
    allowed: HashSet<String>,
}

impl ExactSatisfier {
    /// Creates a satisfier accepting each of `caveats` verbatim
    pub fn new<I, S>(caveats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: caveats.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds another accepted caveat
    pub fn with(mut self, caveat: impl Into<String>) -> Self {
        self.allowed.insert(caveat.into());
        self
    }

    /// Adds another accepted caveat in place
    pub fn allow(&mut self, caveat: impl Into<String>) {
        self.allowed.insert(caveat.into());
    }
}

impl Satisfier for ExactSatisfier {
    fn satisfies(&self, caveat: &str) -> bool {
        self.allowed.contains(caveat)
    }
}

/// A composite satisfier
///
/// Each caveat must be satisfied by at least one member. An empty composite
/// satisfies nothing.
#[derive(Default)]
pub struct AnyOf {
    satisfiers: Vec<Box<dyn Satisfier + Send + Sync>>,
}

impl AnyOf {
    /// Creates an empty composite
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member satisfier
    pub fn with<S: Satisfier + Send + Sync + 'static>(mut self, satisfier: S) -> Self {
        self.satisfiers.push(Box::new(satisfier));
        self
    }
}

impl Satisfier for AnyOf {
    fn satisfies(&self, caveat: &str) -> bool {
        self.satisfiers.iter().any(|s| s.satisfies(caveat))
    }
}
