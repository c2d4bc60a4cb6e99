#[cfg(test)]
mod tests {
    use crate::{
        Error, Identity, LogLevel, ScopeRequest, ScopeSettings, compile_name_filter,
        guardfile_includes, merge_scope, parse_log_level,
    };

    #[test]
    fn log_levels_match_exactly() {
        assert_eq!(parse_log_level("debug").unwrap(), LogLevel::Debug);
        assert_eq!(parse_log_level("error").unwrap(), LogLevel::Error);
        assert!(matches!(
            parse_log_level("Debug"),
            Err(Error::InvalidLoggerOption(_))
        ));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn name_filter_is_case_insensitive_alternation() {
        let re = compile_name_filter(&["rspec".to_string(), "jasmine".to_string()])
            .unwrap()
            .unwrap();
        assert!(re.is_match("RSpec"));
        assert!(re.is_match("guard-jasmine"));
        assert!(!re.is_match("minitest"));
        assert!(compile_name_filter(&[]).unwrap().is_none());
    }

    #[test]
    fn name_filter_fragments_keep_regex_meaning() {
        let re = compile_name_filter(&["rspec|jasmine".to_string(), "^mini".to_string()])
            .unwrap()
            .unwrap();
        assert!(re.is_match("jasmine"));
        assert!(re.is_match("Minitest"));
        assert!(!re.is_match("guard-minitest"));
    }

    #[test]
    fn invalid_name_filter_is_a_logger_option_error() {
        let err = compile_name_filter(&["(rspec".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidLoggerOption(_)));
        assert_eq!(err.to_string(), "Invalid logger filter `(rspec` ignored.");
    }

    #[test]
    fn scope_merge_respects_existing_dimensions() {
        let mut scope = ScopeSettings {
            plugins: Vec::new(),
            groups: vec![Identity::sym("backend")],
        };
        let conflicts = merge_scope(
            &mut scope,
            ScopeRequest {
                plugins: Some(vec![Identity::sym("baz")]),
                groups: Some(vec![Identity::sym("frontend")]),
            },
        );
        assert_eq!(conflicts, vec!["group"]);
        assert_eq!(scope.plugins, vec![Identity::sym("baz")]);
        assert_eq!(scope.groups, vec![Identity::sym("backend")]);
    }

    #[test]
    fn scope_merge_ignores_unspecified_dimensions() {
        let mut scope = ScopeSettings {
            plugins: vec![Identity::str("rspec")],
            groups: Vec::new(),
        };
        let conflicts = merge_scope(&mut scope, ScopeRequest::default());
        assert!(conflicts.is_empty());
        assert_eq!(scope.plugins, vec![Identity::str("rspec")]);
    }

    #[test]
    fn guardfile_includes_surface_syntaxes() {
        assert!(guardfile_includes("guard 'test'", "test"));
        assert!(guardfile_includes("guard \"test\"", "test"));
        assert!(guardfile_includes("guard :test", "test"));
        assert!(guardfile_includes("guard(:test)", "test"));
        assert!(guardfile_includes("guard(\"test\", #{ a: 1 });", "test"));
        assert!(guardfile_includes("  guard(sym(\"test\"));", "test"));
        assert!(guardfile_includes("group(\"g\", || {\n  guard(`test`);\n});", "test"));
    }

    #[test]
    fn guardfile_includes_rejects_near_misses() {
        assert!(!guardfile_includes("guard :testing", "test"));
        assert!(!guardfile_includes("guard 'other'", "test"));
        assert!(!guardfile_includes("notification :test", "test"));
        assert!(!guardfile_includes("", "test"));
    }
}
