//! Typed Ipopt options, common-alias translation, and defaults.

use std::collections::BTreeMap;
use std::fmt;

/// An option value in one of the three types Ipopt's option interface
/// accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Int(i32),
    Num(f64),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Num(v) => write!(f, "{v}"),
            OptionValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Num(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

/// Options forwarded to Ipopt after alias translation. A `BTreeMap` keeps
/// registration order deterministic.
#[derive(Debug, Clone, Default)]
pub struct IpoptOptions {
    entries: BTreeMap<String, OptionValue>,
}

impl IpoptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Move `alias`'s value to `native`, unless the native name is already
    /// present; the native spelling always wins when both are given.
    fn rename_alias(&mut self, alias: &str, native: &str) {
        if let Some(value) = self.entries.remove(alias) {
            self.entries.entry(native.to_string()).or_insert(value);
        }
    }

    /// Rename the common aliases and fill in defaults: silent output, the
    /// caller's convergence tolerance (1e-8 when unspecified), an adaptive
    /// barrier-parameter strategy, and, only when no Hessian information was
    /// supplied at all, a limited-memory quasi-Newton approximation so the
    /// solver does not require one.
    pub(crate) fn translate(&mut self, tol: Option<f64>, quasi_newton: bool) {
        self.rename_alias("disp", "print_level");
        self.rename_alias("maxiter", "max_iter");
        self.entries
            .entry("print_level".to_string())
            .or_insert(OptionValue::Int(0));
        self.entries
            .entry("tol".to_string())
            .or_insert(OptionValue::Num(tol.unwrap_or(1e-8)));
        self.entries
            .entry("mu_strategy".to_string())
            .or_insert_with(|| OptionValue::Str("adaptive".to_string()));
        if quasi_newton {
            self.entries
                .entry("hessian_approximation".to_string())
                .or_insert_with(|| OptionValue::Str("limited-memory".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("disp", "print_level")]
    #[case("maxiter", "max_iter")]
    fn aliases_are_renamed_to_native_options(#[case] alias: &str, #[case] native: &str) {
        let mut opts = IpoptOptions::new();
        opts.set(alias, 3);
        opts.translate(None, false);
        assert!(!opts.contains(alias));
        assert_eq!(opts.get(native), Some(&OptionValue::Int(3)));
    }

    #[test]
    fn native_name_wins_over_its_alias() {
        let mut opts = IpoptOptions::new();
        opts.set("maxiter", 10);
        opts.set("max_iter", 500);
        opts.translate(None, false);
        assert_eq!(opts.get("max_iter"), Some(&OptionValue::Int(500)));
        assert!(!opts.contains("maxiter"));
    }

    #[test]
    fn defaults_are_filled_without_clobbering_caller_values() {
        let mut opts = IpoptOptions::new();
        opts.set("tol", 1e-4);
        opts.translate(Some(1e-10), true);
        assert_eq!(opts.get("tol"), Some(&OptionValue::Num(1e-4)));
        assert_eq!(opts.get("print_level"), Some(&OptionValue::Int(0)));
        assert_eq!(
            opts.get("mu_strategy"),
            Some(&OptionValue::Str("adaptive".to_string()))
        );
        assert_eq!(
            opts.get("hessian_approximation"),
            Some(&OptionValue::Str("limited-memory".to_string()))
        );
    }

    #[test]
    fn caller_tolerance_becomes_the_default() {
        let mut opts = IpoptOptions::new();
        opts.translate(Some(1e-6), false);
        assert_eq!(opts.get("tol"), Some(&OptionValue::Num(1e-6)));
    }

    #[test]
    fn quasi_newton_is_not_forced_when_a_hessian_exists() {
        let mut opts = IpoptOptions::new();
        opts.translate(None, false);
        assert!(!opts.contains("hessian_approximation"));
    }
}
