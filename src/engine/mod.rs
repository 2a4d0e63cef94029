pub mod correlate;
pub mod devices;
pub mod disk;
pub mod health;
pub mod links;
pub mod matcher;
pub mod normalize;
pub mod reconcile;
pub mod recommend;
pub mod rules;
pub mod segment;
#[cfg(test)]
mod tests;

/// Bumped whenever a rule table or a fallback default changes, so hand-off
/// artifacts from different rule sets can be told apart.
pub const ENGINE_VERSION: &str = "0.1.0";
