#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        Identity, Options, PluginEntry, Registry, ScopeSettings, describe, summary,
    };

    fn plugin_in(name: &str, group: Identity) -> PluginEntry {
        let mut p = PluginEntry::new(Identity::str(name));
        p.group = group;
        p
    }

    #[test]
    fn new_registry_holds_only_the_default_group() {
        let r = Registry::new();
        assert_eq!(r.plugin_count(), 0);
        let groups: Vec<_> = r.groups().map(|g| g.identity.clone()).collect();
        assert_eq!(groups, vec![Identity::default_group()]);
    }

    #[test]
    fn add_plugin_tracks_group_membership() {
        let mut r = Registry::new();
        r.add_plugin(PluginEntry::new(Identity::str("rspec")));
        r.add_plugin(plugin_in("jasmine", Identity::sym("frontend")));

        let default = r.group(&Identity::default_group()).unwrap();
        assert_eq!(default.plugins, vec![Identity::str("rspec")]);
        let frontend = r.group(&Identity::sym("frontend")).unwrap();
        assert_eq!(frontend.plugins, vec![Identity::str("jasmine")]);
    }

    #[test]
    fn replacing_a_plugin_moves_it_between_groups() {
        let mut r = Registry::new();
        r.add_plugin(PluginEntry::new(Identity::str("rspec")));
        r.add_plugin(plugin_in("rspec", Identity::sym("backend")));

        assert_eq!(r.plugin_count(), 1);
        assert!(r.group(&Identity::default_group()).unwrap().plugins.is_empty());
        assert_eq!(
            r.group(&Identity::sym("backend")).unwrap().plugins,
            vec![Identity::str("rspec")]
        );
    }

    #[test]
    fn add_group_merges_options() {
        let mut r = Registry::new();
        let mut first = Options::new();
        first.insert("halt_on_fail".into(), json!(true));
        let mut second = Options::new();
        second.insert("other".into(), json!(1));
        r.add_group(Identity::sym("g"), first);
        r.add_group(Identity::sym("g"), second);
        let g = r.group(&Identity::sym("g")).unwrap();
        assert_eq!(g.options.len(), 2);
    }

    #[test]
    fn resets_clear_plugins_and_recreate_default_group() {
        let mut r = Registry::new();
        r.add_plugin(plugin_in("jasmine", Identity::sym("frontend")));
        r.reset_plugins();
        assert_eq!(r.plugin_count(), 0);
        assert_eq!(r.groups().count(), 0);
        r.reset_groups();
        let groups: Vec<_> = r.groups().map(|g| g.identity.clone()).collect();
        assert_eq!(groups, vec![Identity::default_group()]);
    }

    #[test]
    fn restore_scope_returns_to_command_line_scope() {
        let cli = ScopeSettings {
            plugins: Vec::new(),
            groups: vec![Identity::sym("backend")],
        };
        let mut r = Registry::with_scope(cli.clone());
        r.set_scope(ScopeSettings {
            plugins: vec![Identity::sym("baz")],
            groups: cli.groups.clone(),
        });
        r.restore_scope();
        assert_eq!(r.scope(), &cli);
        assert_eq!(r.cli_scope(), &cli);
    }

    #[test]
    fn scoped_plugins_prefer_plugin_scope_then_groups() {
        let mut r = Registry::new();
        r.add_plugin(PluginEntry::new(Identity::str("rspec")));
        r.add_plugin(plugin_in("jasmine", Identity::sym("frontend")));
        r.add_plugin(plugin_in("coffee", Identity::sym("frontend")));

        let names = |r: &Registry| -> Vec<String> {
            r.scoped_plugins()
                .iter()
                .map(|p| p.identity.name().to_string())
                .collect()
        };
        assert_eq!(names(&r), vec!["rspec", "jasmine", "coffee"]);

        r.set_scope(ScopeSettings {
            plugins: Vec::new(),
            groups: vec![Identity::str("frontend")],
        });
        assert_eq!(names(&r), vec!["jasmine", "coffee"]);

        r.set_scope(ScopeSettings {
            plugins: vec![Identity::sym("rspec")],
            groups: vec![Identity::sym("frontend")],
        });
        assert_eq!(names(&r), vec!["rspec"]);
    }

    #[test]
    fn contains_plugin_scans_the_evaluated_source() {
        let mut r = Registry::new();
        r.set_source("group(\"g\", || {\n  guard(\"rspec\");\n});\nguard(sym(\"jasmine\"));".into());
        assert!(r.contains_plugin("rspec"));
        assert!(r.contains_plugin("jasmine"));
        assert!(!r.contains_plugin("minitest"));
    }

    #[test]
    fn plugin_named_ignores_token_kind() {
        let mut r = Registry::new();
        r.add_plugin(PluginEntry::new(Identity::sym("rspec")));
        assert!(r.plugin(&Identity::str("rspec")).is_none());
        assert_eq!(
            r.plugin_named("rspec").map(|p| p.identity.clone()),
            Some(Identity::sym("rspec"))
        );
    }

    #[test]
    fn describe_lists_groups_and_options() {
        let mut r = Registry::new();
        let mut p = PluginEntry::new(Identity::str("rspec"));
        p.options.insert("cmd".into(), json!("rspec"));
        r.add_plugin(p);
        r.add_group(Identity::sym("empty"), Options::new());

        let text = describe(&r);
        assert_eq!(text, "Group default:\n  rspec\n    cmd: \"rspec\"\n");
        assert_eq!(describe(&Registry::new()), "No plugins registered.\n");
    }

    #[test]
    fn summary_serializes_identity_tokens() {
        let mut r = Registry::new();
        r.add_plugin(plugin_in("jasmine", Identity::sym("frontend")));
        let value = serde_json::to_value(summary(&r)).unwrap();
        assert_eq!(value["groups"][1]["identity"], json!(":frontend"));
        assert_eq!(value["groups"][1]["plugins"][0]["identity"], json!("\"jasmine\""));
        assert_eq!(value["logger"]["level"], json!("info"));
    }
}
