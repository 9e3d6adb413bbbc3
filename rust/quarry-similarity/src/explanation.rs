use std::fmt;

/// A tree describing how a score was computed.
///
/// Every node carries the value it contributes and a human-readable description;
/// the details are the factors the value was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    value: f32,
    description: String,
    details: Vec<Explanation>,
    matched: Option<bool>,
}

impl Explanation {
    pub fn new(value: f32, description: impl Into<String>) -> Explanation {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
            matched: None,
        }
    }

    /// An explanation whose match flag is set explicitly rather than derived from
    /// the value.
    pub fn with_match(matched: bool, value: f32, description: impl Into<String>) -> Explanation {
        Explanation {
            matched: Some(matched),
            ..Explanation::new(value, description)
        }
    }

    pub fn no_match(description: impl Into<String>) -> Explanation {
        Explanation::with_match(false, 0.0, description)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn details(&self) -> &[Explanation] {
        &self.details
    }

    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    pub fn with_detail(mut self, detail: Explanation) -> Explanation {
        self.details.push(detail);
        self
    }

    /// Whether the explained document matched. Defaults to a positive value.
    pub fn is_match(&self) -> bool {
        self.matched.unwrap_or(self.value > 0.0)
    }

    pub fn set_match(&mut self, matched: bool) {
        self.matched = Some(matched);
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        writeln!(f, "{} = {}", self.value, self.description)?;
        for detail in &self.details {
            detail.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_indents_details() {
        let expl = Explanation::new(6.0, "product of:")
            .with_detail(Explanation::new(2.0, "boost"))
            .with_detail(Explanation::new(3.0, "idf").with_detail(Explanation::new(10.0, "docFreq")));
        assert_eq!(
            expl.to_string(),
            "6 = product of:\n  2 = boost\n  3 = idf\n    10 = docFreq\n"
        );
    }

    #[test]
    fn test_match_flag() {
        assert!(Explanation::new(0.5, "x").is_match());
        assert!(!Explanation::new(0.0, "x").is_match());
        assert!(!Explanation::no_match("nothing").is_match());
        let mut expl = Explanation::new(0.0, "x");
        expl.set_match(true);
        assert!(expl.is_match());
    }
}
