use bimap::BiMap;
use tamon::clock::{ClockPart, Retention};
use tamon::expr::Expr;
use tamon::parse;
use tamon::truth::Comparison;
use tamon::{MonitorError, Table, TableBuilder};

fn setup() -> Table {
    Table::parse(include_str!("../demos/nondet_ecs.ta")).expect("gate controller parses")
}

#[test]
fn modes_clocks_and_rules_are_indexed() {
    let table = setup();
    assert_eq!(table.name(), "NonDetEcs");
    let open = table.mode_id("open").expect("open");
    let closed = table.mode_id("closed").expect("closed");
    assert_eq!(table.initial(), &[open, closed]);
    assert_eq!(table.mode_name(open), "open");
    assert_eq!(table.clock_count(), 2);
    assert_eq!(table.clock_id("timer"), Some(0));
    assert_eq!(table.clock_name(1), "t");
    let rules = table.rules(open);
    assert_eq!(rules.len(), 2);
    assert_eq!(table.mode_name(rules[1].target()), "Closing");
    assert_eq!(rules[1].resets(), &[0, 1]);
    assert_eq!(rules[1].postcondition(), &Expr::Bool(true));
    let variables: Vec<&String> = table.variables().keys().collect();
    assert_eq!(variables, vec!["duration", "gate_closed", "tl", "wl"]);
    assert_eq!(table.clock_depths().get(&0), Some(&0));
}

#[test]
fn names_resolve_to_clocks_before_variables() {
    let mut clocks = BiMap::new();
    clocks.insert("timer".to_string(), 0u32);
    let guard = parse::guard("timer@2.env < limit", &clocks).expect("guard parses");
    let expected = Expr::compare(
        Comparison::Lt,
        Expr::Clock {
            id: 0,
            name: "timer".into(),
            depth: 2,
            part: ClockPart::Env,
        },
        Expr::var("limit"),
    );
    assert_eq!(guard, expected);
    assert!(matches!(
        parse::guard("limit.sys < 3", &clocks),
        Err(MonitorError::Parse { .. })
    ));
}

#[test]
fn negative_literals_cover_the_full_range() {
    let clocks = BiMap::new();
    let guard = parse::guard("x > -9223372036854775808", &clocks).expect("guard parses");
    assert_eq!(
        guard,
        Expr::compare(Comparison::Gt, Expr::var("x"), Expr::Int(i64::MIN))
    );
    let spaced = parse::guard("x - 5 == - 5", &clocks).expect("guard parses");
    assert_eq!(spaced.to_string(), "x - 5 == -5");
    assert!(matches!(
        parse::guard("x > 9223372036854775808", &clocks),
        Err(MonitorError::Parse { .. })
    ));
}

#[test]
fn operators_bind_conventionally() {
    let clocks = BiMap::new();
    let guard = parse::guard("a || b && !c == 1", &clocks).expect("guard parses");
    let expected = Expr::or(
        Expr::var("a"),
        Expr::and(
            Expr::var("b"),
            Expr::compare(Comparison::Eq, Expr::not(Expr::var("c")), Expr::Int(1)),
        ),
    );
    assert_eq!(guard, expected);
    assert_eq!(guard.to_string(), "a || b && !c == 1");
}

#[test]
fn syntax_errors_carry_a_position() {
    let text = "automaton Broken {\n    initial a;\n    a -> when x;\n}";
    match Table::parse(text) {
        Err(MonitorError::Parse { line, col, .. }) => {
            assert_eq!(line, Some(3));
            assert!(col.is_some());
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn semantic_errors_are_reported() {
    let cases = [
        "automaton A { clock t; initial a; a -> a reset q; }",
        "automaton A { clock t; a -> a; }",
        "automaton A { initial a; a -> a when x + 1; }",
        "automaton A { initial a; a -> a when (x < 1) < 2; }",
        "automaton A { clock t, t; initial a; }",
    ];
    for text in cases {
        assert!(
            matches!(Table::parse(text), Err(MonitorError::Specification(_))),
            "{text} should be rejected"
        );
    }
}

#[test]
fn clock_retention_is_declared_per_clock() {
    let table = Table::parse(
        "automaton Keep {
            clock a keep 3;
            clock b, c keep all;
            clock d keep latest;
            clock e;
            initial m;
            m -> m when a@2 > 0 reset b; // comments are ignored
        }",
    )
    .expect("parses");
    let retentions: Vec<Option<Retention>> = table.clocks().iter().map(|c| c.retention()).collect();
    assert_eq!(
        retentions,
        vec![
            Some(Retention::Ring(3)),
            Some(Retention::Unbounded),
            Some(Retention::Unbounded),
            Some(Retention::Latest),
            None
        ]
    );
    assert_eq!(table.clock_depths().get(&0), Some(&2));
}

#[test]
fn printed_tables_parse_back() {
    let table = setup();
    let printed = table.to_string();
    let reparsed = Table::parse(&printed).expect("printed table parses");
    assert_eq!(reparsed.to_string(), printed);
    assert_eq!(reparsed.rule_count(), table.rule_count());
}

#[test]
fn builder_matches_description() {
    let built = TableBuilder::new("Drain")
        .clock("tD")
        .clock("t")
        .initial("d")
        .rule("d", "d", "P && (tD < e || !HW)", "", &["t"])
        .rule("d", "d", "!P", "", &["tD", "t"])
        .build()
        .expect("builds");
    let parsed = Table::parse(include_str!("../demos/drain.ta")).expect("parses");
    assert_eq!(built.to_string(), parsed.to_string());
    assert!(
        TableBuilder::new("Bad")
            .initial("a")
            .rule("a", "a", "x <", "", &[])
            .build()
            .is_err()
    );
}

#[test]
fn renders_graphviz() {
    let dot = setup().to_dot();
    assert!(dot.starts_with("digraph NonDetEcs {"));
    assert!(dot.contains("start -> m0;"));
    assert!(dot.contains("start -> m1;"));
    assert!(dot.contains("m0 [label=\"{open|1: wl \\<= tl / true|2: wl \\>= tl / true}\"];"));
    assert!(dot.contains("m0 -> m2 [label=\"2 reset timer, t\"];"));
    assert!(dot.trim_end().ends_with('}'));
}
