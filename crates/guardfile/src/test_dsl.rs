#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        Error, Events, Identity, Interpreter, Listener, LogLevel, Notifier, Pattern, Provenance,
        Registry, ScopeSettings, Source,
        test_support::{
            ListenerCall, RecordingCallback, RecordingListener, RecordingNotifier, RecordingUi,
        },
    };

    struct Eval {
        ui: RecordingUi,
        notifier: RecordingNotifier,
        registry: Registry,
        result: Result<usize, Error>,
    }

    fn inline(script: &str) -> Source {
        Source {
            provenance: Provenance::Inline,
            text: script.to_string(),
            user_config: None,
        }
    }

    fn eval_into(
        mut registry: Registry,
        interpreter: Option<Interpreter>,
        ui: RecordingUi,
        script: &str,
    ) -> Eval {
        let interpreter = interpreter.unwrap_or_else(|| Interpreter::new(Arc::new(ui.clone())));
        let mut notifier = RecordingNotifier::new(true);
        let result = interpreter.evaluate(&inline(script), &mut registry, &mut notifier);
        Eval {
            ui,
            notifier,
            registry,
            result,
        }
    }

    fn eval(script: &str) -> Eval {
        eval_into(Registry::new(), None, RecordingUi::new(), script)
    }

    #[test]
    fn string_and_symbol_guards_register_with_default_options() {
        let e = eval(
            r#"
            guard("test");
            guard(sym("test"));
            guard(sym("other"));
            "#,
        );
        assert_eq!(e.result.unwrap(), 3);
        assert!(e.ui.errors().is_empty());

        let plugin = e.registry.plugin(&Identity::str("test")).unwrap();
        assert!(plugin.watchers.is_empty());
        assert!(plugin.callbacks.is_empty());
        assert_eq!(plugin.group, Identity::sym("default"));
        assert!(plugin.options.is_empty());
        assert!(e.registry.plugin(&Identity::sym("test")).is_some());
        assert_ne!(Identity::str("test"), Identity::sym("test"));
    }

    #[test]
    fn guard_options_are_kept() {
        let e = eval(r#"guard("rspec", #{ cmd: "bundle exec rspec", all_on_start: false, retries: 2 });"#);
        let plugin = e.registry.plugin(&Identity::str("rspec")).unwrap();
        assert_eq!(plugin.options["cmd"], json!("bundle exec rspec"));
        assert_eq!(plugin.options["all_on_start"], json!(false));
        assert_eq!(plugin.options["retries"], json!(2));
    }

    #[test]
    fn redeclared_guard_replaces_earlier_entry() {
        let e = eval(
            r#"
            guard("rspec", #{ cmd: "a" });
            guard("minitest");
            guard("rspec", #{ cmd: "b" });
            "#,
        );
        assert_eq!(e.result.unwrap(), 2);
        let names: Vec<_> = e.registry.plugins().map(|p| p.identity.name().to_string()).collect();
        assert_eq!(names, vec!["rspec", "minitest"]);
        let plugin = e.registry.plugin(&Identity::str("rspec")).unwrap();
        assert_eq!(plugin.options["cmd"], json!("b"));
    }

    #[test]
    fn empty_source_reports_no_plugins_once() {
        let e = eval("");
        assert_eq!(e.result.unwrap(), 0);
        assert_eq!(
            e.ui.errors(),
            vec!["No Guard plugins found in Guardfile, please add at least one.".to_string()]
        );
    }

    #[test]
    fn empty_group_reports_its_name() {
        let e = eval(
            r#"
            guard("a");
            group(sym("w"), || {});
            "#,
        );
        assert_eq!(e.result.unwrap(), 1);
        assert_eq!(
            e.ui.errors(),
            vec!["No Guard plugins found in the group 'w', please add at least one.".to_string()]
        );
    }

    #[test]
    fn group_scopes_nested_guards_and_restores_default() {
        let e = eval(
            r#"
            group(sym("frontend"), #{ halt_on_fail: true }, || {
                guard("jasmine");
                guard("coffeescript");
            });
            guard("rspec");
            "#,
        );
        assert!(e.ui.errors().is_empty());

        let frontend = e.registry.group(&Identity::sym("frontend")).unwrap();
        assert_eq!(frontend.options["halt_on_fail"], json!(true));
        assert_eq!(
            frontend.plugins,
            vec![Identity::str("jasmine"), Identity::str("coffeescript")]
        );
        let rspec = e.registry.plugin(&Identity::str("rspec")).unwrap();
        assert_eq!(rspec.group, Identity::default_group());
    }

    #[test]
    fn nested_groups_restore_the_outer_group() {
        let e = eval(
            r#"
            group("outer", || {
                group("inner", || { guard("a"); });
                guard("b");
            });
            "#,
        );
        let group_of = |name: &str| e.registry.plugin(&Identity::str(name)).unwrap().group.clone();
        assert_eq!(group_of("a"), Identity::sym("inner"));
        assert_eq!(group_of("b"), Identity::sym("outer"));
    }

    #[test]
    fn string_and_symbol_group_names_are_one_group() {
        let e = eval(
            r#"
            group("default", || { guard("a"); });
            group("web", #{ halt_on_fail: true }, || { guard("b"); });
            group(sym("web"), || { guard("c"); });
            "#,
        );
        assert!(e.ui.errors().is_empty());
        let groups: Vec<_> = e.registry.groups().map(|g| g.identity.clone()).collect();
        assert_eq!(groups, vec![Identity::default_group(), Identity::sym("web")]);

        let default = e.registry.group(&Identity::default_group()).unwrap();
        assert_eq!(default.plugins, vec![Identity::str("a")]);
        let web = e.registry.group(&Identity::sym("web")).unwrap();
        assert_eq!(web.plugins, vec![Identity::str("b"), Identity::str("c")]);
        assert_eq!(web.options["halt_on_fail"], json!(true));
    }

    #[test]
    fn watchers_keep_declaration_order() {
        let e = eval(
            r#"
            guard("rspec", || {
                watch(regex("^spec/.+_spec\\.rb$"));
                watch("spec/spec_helper.rb", |m| "spec");
            });
            "#,
        );
        let plugin = e.registry.plugin(&Identity::str("rspec")).unwrap();
        assert_eq!(plugin.watchers.len(), 2);
        assert!(matches!(plugin.watchers[0].pattern, Pattern::Regex(_)));
        assert!(plugin.watchers[0].action.is_none());
        assert_eq!(
            plugin.watchers[1].pattern,
            Pattern::Literal("spec/spec_helper.rb".to_string())
        );
        assert!(plugin.watchers[1].action.is_some());
    }

    #[test]
    fn watch_outside_guard_is_invalid() {
        let e = eval(r#"watch("a.rb");"#);
        let Err(Error::Invalid { message, line, .. }) = e.result else {
            panic!("expected invalid guardfile");
        };
        assert!(message.contains("watch is only valid inside a guard block"));
        assert_eq!(line, Some(1));
        assert_eq!(e.registry.plugin_count(), 0);
    }

    #[test]
    fn nested_guard_is_invalid() {
        let e = eval(r#"guard("a", || { guard("b"); });"#);
        let Err(Error::Invalid { message, .. }) = e.result else {
            panic!("expected invalid guardfile");
        };
        assert!(message.contains("cannot be declared inside the block"));
    }

    #[test]
    fn unknown_directive_is_invalid_and_commits_nothing() {
        let e = eval(
            r#"
            guard("a");
            frobnicate(1);
            "#,
        );
        let err = e.result.unwrap_err();
        assert!(matches!(err, Error::Invalid { line: Some(3), .. }));
        assert!(err.to_string().starts_with("Invalid Guardfile, original error is:"));
        assert_eq!(e.registry.plugin_count(), 0);
    }

    #[test]
    fn syntax_errors_carry_an_excerpt() {
        let e = eval("guard(\"a\";\n");
        let Err(Error::Invalid { excerpt, line, .. }) = e.result else {
            panic!("expected invalid guardfile");
        };
        assert!(line.is_some());
        assert!(excerpt.unwrap().contains('^'));
    }

    #[test]
    fn callbacks_accept_inline_and_listener_forms() {
        let ui = RecordingUi::new();
        let mut interpreter = Interpreter::new(Arc::new(ui.clone()));
        interpreter.register_listener("recorder", Arc::new(RecordingCallback::default()));
        let e = eval_into(
            Registry::new(),
            Some(interpreter),
            ui,
            r#"
            guard("rspec", || {
                callback(sym("start_end"), |plugin, event, args| { print(event); });
                callback(listener("recorder"), ["start_begin", sym("run_all_begin")]);
            });
            "#,
        );
        let plugin = e.registry.plugin(&Identity::str("rspec")).unwrap();
        assert_eq!(plugin.callbacks.len(), 2);
        assert_eq!(plugin.callbacks[0].events, Events::One("start_end".to_string()));
        assert!(matches!(plugin.callbacks[0].listener, Listener::Inline(_)));
        assert_eq!(
            plugin.callbacks[1].events,
            Events::Many(vec!["start_begin".to_string(), "run_all_begin".to_string()])
        );
        assert!(matches!(
            &plugin.callbacks[1].listener,
            Listener::External { name, .. } if name == "recorder"
        ));
    }

    #[test]
    fn unknown_listener_is_invalid() {
        let e = eval(r#"guard("a", || { callback(listener("nope"), "start_begin"); });"#);
        let Err(Error::Invalid { message, .. }) = e.result else {
            panic!("expected invalid guardfile");
        };
        assert!(message.contains("unknown callback listener: nope"));
    }

    #[test]
    fn notifications_accumulate() {
        let e = eval(
            r#"
            guard("a");
            notification(sym("growl"));
            notification(sym("tmux"), #{ display_message: true });
            "#,
        );
        let configs = e.notifier.notifications();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, Identity::sym("growl"));
        assert_eq!(configs[1].options["display_message"], json!(true));
        assert!(configs.iter().all(|c| !c.standalone));
    }

    #[test]
    fn logger_only_and_except_together_warn_and_apply_neither() {
        let e = eval(
            r#"
            guard("a");
            logger(#{ only: sym("jasmine"), except: sym("rspec") });
            "#,
        );
        assert_eq!(e.ui.warnings().len(), 1);
        assert!(e.registry.logger().only.is_none());
        assert!(e.registry.logger().except.is_none());
    }

    #[test]
    fn logger_normalizes_level_and_filters() {
        let e = eval(
            r#"
            guard("a");
            logger(#{ level: sym("warn"), template: "[:severity] :message", only: [sym("rspec"), "jasmine"] });
            "#,
        );
        assert!(e.ui.warnings().is_empty());
        let logger = e.registry.logger();
        assert_eq!(logger.level, LogLevel::Warn);
        assert_eq!(logger.template.as_deref(), Some("[:severity] :message"));
        let only = logger.only.as_ref().unwrap();
        assert!(only.is_match("RSpec"));
        assert!(only.is_match("jasmine"));
        assert!(!only.is_match("minitest"));
    }

    #[test]
    fn logger_invalid_level_keeps_previous() {
        let e = eval(
            r#"
            guard("a");
            logger(#{ level: "error" });
            logger(#{ level: "verbose" });
            "#,
        );
        assert_eq!(e.registry.logger().level, LogLevel::Error);
        assert_eq!(
            e.ui.warnings(),
            vec!["Invalid log level `verbose` ignored. Please use either debug, info, warn or error.".to_string()]
        );
    }

    #[test]
    fn logger_invalid_filter_keeps_previous() {
        let e = eval(
            r#"
            guard("a");
            logger(#{ only: "rspec|jasmine" });
            logger(#{ except: "(rspec" });
            "#,
        );
        let logger = e.registry.logger();
        assert!(logger.only.as_ref().unwrap().is_match("jasmine"));
        assert!(logger.except.is_none());
        assert_eq!(
            e.ui.warnings(),
            vec!["Invalid logger filter `(rspec` ignored.".to_string()]
        );
    }

    #[test]
    fn interactor_forms() {
        let off = eval(r#"guard("a"); interactor(off);"#);
        assert!(!off.registry.interactor().enabled);
        assert!(off.ui.deprecations().is_empty());

        let named = eval(r#"guard("a"); interactor(sym("coolline"));"#);
        assert!(named.registry.interactor().enabled);
        assert_eq!(named.ui.deprecations().len(), 1);

        let opts = eval(r#"guard("a"); interactor(#{ guard_shell: true });"#);
        assert!(opts.registry.interactor().enabled);
        assert_eq!(opts.registry.interactor().options["guard_shell"], json!(true));
        assert!(opts.ui.deprecations().is_empty());
    }

    #[test]
    fn scope_applies_when_command_line_scope_is_empty() {
        let e = eval(r#"guard("baz"); scope(#{ plugin: sym("baz"), groups: [sym("a"), sym("b")] });"#);
        assert_eq!(e.registry.scope().plugins, vec![Identity::sym("baz")]);
        assert_eq!(e.registry.scope().groups, vec![Identity::sym("a"), Identity::sym("b")]);
        assert!(e.ui.warnings().is_empty());
    }

    #[test]
    fn scope_yields_to_command_line_scope() {
        let cli = ScopeSettings {
            plugins: vec![Identity::str("rspec")],
            groups: Vec::new(),
        };
        let e = eval_into(
            Registry::with_scope(cli),
            None,
            RecordingUi::new(),
            r#"guard("baz"); scope(#{ plugins: [sym("baz")], group: sym("g") });"#,
        );
        assert_eq!(e.registry.scope().plugins, vec![Identity::str("rspec")]);
        assert_eq!(e.registry.scope().groups, vec![Identity::sym("g")]);
        assert_eq!(
            e.ui.warnings(),
            vec!["Guardfile scope for plugin ignored, a plugin scope is already set.".to_string()]
        );
    }

    #[test]
    fn ignore_and_filter_update_the_listener() {
        let (listener, calls) = RecordingListener::new();
        let registry = Registry::new().with_listener(Box::new(listener));
        let e = eval_into(
            registry,
            None,
            RecordingUi::new(),
            r#"
            guard("a");
            ignore([regex("^foo"), regex("bar")]);
            ignore_replace(regex("baz"));
            filter("tmp");
            filter_replace(["log", "db"]);
            "#,
        );
        assert!(e.result.is_ok());

        let calls = calls.lock().clone();
        assert_eq!(calls.len(), 4);
        let ListenerCall::Ignore(first) = &calls[0] else {
            panic!("expected additive ignore");
        };
        assert_eq!(
            first.iter().map(Pattern::as_str).collect::<Vec<_>>(),
            vec!["^foo", "bar"]
        );
        assert!(matches!(calls[1], ListenerCall::IgnoreReplace(_)));
        assert!(matches!(calls[2], ListenerCall::Filter(_)));
        assert!(matches!(calls[3], ListenerCall::FilterReplace(_)));

        let listener = e.registry.listener().unwrap();
        assert_eq!(
            listener.ignored().iter().map(Pattern::as_str).collect::<Vec<_>>(),
            vec!["baz"]
        );
        assert_eq!(
            listener.filtered().iter().map(Pattern::as_str).collect::<Vec<_>>(),
            vec!["log", "db"]
        );
    }

    #[test]
    fn ignore_paths_is_deprecated_alias() {
        let (listener, calls) = RecordingListener::new();
        let e = eval_into(
            Registry::new().with_listener(Box::new(listener)),
            None,
            RecordingUi::new(),
            r#"guard("a"); ignore_paths(["vendor", "tmp"]);"#,
        );
        assert_eq!(e.ui.deprecations().len(), 1);
        assert!(matches!(&calls.lock()[0], ListenerCall::Ignore(p) if p.len() == 2));
        assert_eq!(e.registry.listener().unwrap().ignored().len(), 2);
    }

    #[test]
    fn invalid_regex_is_invalid_guardfile() {
        let e = eval(r#"guard("a", || { watch(regex("(")); });"#);
        let Err(Error::Invalid { message, .. }) = e.result else {
            panic!("expected invalid guardfile");
        };
        assert!(message.contains("invalid regex"));
    }
}
