use callcenter_core::settings::ClassifierSettings;

/// Flags regulatory/policy-flavoured queries by keyword.
#[derive(Debug, Clone)]
pub struct PolicyQueryClassifier {
    keywords: Vec<String>,
}

impl PolicyQueryClassifier {
    pub fn new(settings: &ClassifierSettings) -> Self {
        let keywords = settings
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_policy_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.keywords.iter().any(|k| q.contains(k.as_str()))
    }
}

impl Default for PolicyQueryClassifier {
    fn default() -> Self {
        Self::new(&ClassifierSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_question_is_policy() {
        let c = PolicyQueryClassifier::default();
        assert!(c.is_policy_query("What is the RBI provisioning framework for NPA classification?"));
    }

    #[test]
    fn repo_rate_question_is_not_policy() {
        let c = PolicyQueryClassifier::default();
        assert!(!c.is_policy_query("What happens if RBI increases repo rate?"));
    }

    #[test]
    fn matching_ignores_case() {
        let c = PolicyQueryClassifier::default();
        assert!(c.is_policy_query("KYC COMPLIANCE steps"));
    }

    #[test]
    fn empty_query_is_not_policy() {
        let c = PolicyQueryClassifier::default();
        assert!(!c.is_policy_query(""));
        assert!(!c.is_policy_query("   "));
    }

    #[test]
    fn keyword_table_is_configurable() {
        let c = PolicyQueryClassifier::new(&ClassifierSettings { keywords: vec!["Basel".into(), " ".into()] });
        assert!(c.is_policy_query("basel iii capital norms"));
        assert!(!c.is_policy_query("provisioning norms"));
        assert!(!c.is_policy_query("anything at all"), "blank keywords never match");
    }
}
