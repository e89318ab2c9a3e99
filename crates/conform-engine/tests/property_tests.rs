//! Property tests over random dependency graphs, acyclic and cyclic

use conform_engine::{run_tests, Failure, Identity, Plan, Test, TestRef, TestResult};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

/// Node `i` may only depend on nodes `< i`, so the graph is acyclic
#[derive(Debug, Clone)]
struct Dag {
    deps: Vec<Vec<usize>>,
    failing: Vec<bool>,
    requested: Vec<usize>,
}

fn dag_strategy() -> impl Strategy<Value = Dag> {
    (1usize..12).prop_flat_map(|n| {
        let deps = (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..3).boxed()
                }
            })
            .collect::<Vec<_>>();
        let failing = proptest::collection::vec(proptest::bool::weighted(0.2), n);
        let requested = proptest::collection::vec(0..n, 1..6);
        (deps, failing, requested).prop_map(|(deps, failing, requested)| Dag {
            deps,
            failing,
            requested,
        })
    })
}

struct Built {
    tests: Vec<TestRef<()>>,
    calls: Arc<Mutex<Vec<usize>>>,
}

fn build(dag: &Dag, allow_failures: bool) -> Built {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut tests: Vec<TestRef<()>> = Vec::new();

    for (i, deps) in dag.deps.iter().enumerate() {
        let fails = allow_failures && dag.failing[i];
        let recorder = Arc::clone(&calls);
        let test = Test::new("prop", "dag", format!("n{i}"), move |_, _| {
            recorder.lock().unwrap().push(i);
            if fails {
                Ok(TestResult::fail(Failure::new("node failed", format!("n{i}"))))
            } else {
                Ok(TestResult::pass())
            }
        })
        .with_dependencies(deps.iter().map(|&d| Arc::clone(&tests[d])).collect());
        tests.push(test.into_ref());
    }

    Built { tests, calls }
}

fn requested(dag: &Dag, built: &Built) -> Vec<TestRef<()>> {
    dag.requested
        .iter()
        .map(|&i| Arc::clone(&built.tests[i]))
        .collect()
}

/// Any node may depend on any node, itself included
fn graph_strategy() -> impl Strategy<Value = Dag> {
    (1usize..10).prop_flat_map(|n| {
        let deps = proptest::collection::vec(proptest::collection::vec(0..n, 0..3), n);
        let failing = proptest::collection::vec(proptest::bool::weighted(0.2), n);
        let requested = proptest::collection::vec(0..n, 1..6);
        (deps, failing, requested).prop_map(|(deps, failing, requested)| Dag {
            deps,
            failing,
            requested,
        })
    })
}

/// Back edges need tests that do not exist yet, so every edge goes through
/// a resolver reading the finished table
fn build_graph(dag: &Dag, allow_failures: bool) -> Built {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let table: Arc<OnceLock<Vec<TestRef<()>>>> = Arc::new(OnceLock::new());

    let tests: Vec<TestRef<()>> = dag
        .deps
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let fails = allow_failures && dag.failing[i];
            let recorder = Arc::clone(&calls);
            let lookup = Arc::clone(&table);
            let deps = deps.clone();
            Test::new("prop", "graph", format!("n{i}"), move |_, _| {
                recorder.lock().unwrap().push(i);
                if fails {
                    Ok(TestResult::fail(Failure::new("node failed", format!("n{i}"))))
                } else {
                    Ok(TestResult::pass())
                }
            })
            .with_resolver(move |_: &()| {
                let table = lookup.get().expect("table is filled before running");
                deps.iter().map(|&d| Arc::clone(&table[d])).collect()
            })
            .into_ref()
        })
        .collect();

    let _ = table.set(tests.clone());
    Built { tests, calls }
}

fn index_of(id: &Identity) -> usize {
    id.assertion[1..].parse().unwrap()
}

proptest! {
    #[test]
    fn prop_each_identity_emitted_at_most_once(dag in dag_strategy()) {
        let built = build(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();

        let mut seen = HashSet::new();
        for run in &runs {
            prop_assert!(seen.insert(run.test.identity().clone()));
        }

        let calls = built.calls.lock().unwrap();
        let unique: HashSet<_> = calls.iter().collect();
        prop_assert_eq!(unique.len(), calls.len());
    }

    #[test]
    fn prop_every_requested_test_is_reported(dag in dag_strategy()) {
        let built = build(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();
        let emitted: HashSet<usize> = runs.iter().map(|r| index_of(r.test.identity())).collect();

        for &i in &dag.requested {
            prop_assert!(emitted.contains(&i), "n{} was never reported", i);
        }
    }

    #[test]
    fn prop_passing_run_matches_plan_order(dag in dag_strategy()) {
        let built = build(&dag, false);
        let request = requested(&dag, &built);

        let plan = Plan::expand(&request, &()).unwrap();
        let planned: Vec<_> = plan.identities().cloned().collect();
        let executed: Vec<_> = run_tests(&(), request)
            .map(|r| {
                assert!(r.result.is_pass());
                r.test.identity().clone()
            })
            .collect();

        prop_assert_eq!(planned, executed);
    }

    #[test]
    fn prop_dependencies_precede_dependents(dag in dag_strategy()) {
        let built = build(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();
        let position: HashMap<usize, usize> = runs
            .iter()
            .enumerate()
            .map(|(pos, r)| (index_of(r.test.identity()), pos))
            .collect();

        // An invalidated test stops at its first failed dependency, so its
        // remaining dependencies may legitimately be reported later
        for run in runs.iter().filter(|r| r.failure_name() != Some("failed dependency")) {
            let i = index_of(run.test.identity());
            for dep in &dag.deps[i] {
                if let Some(dep_pos) = position.get(dep) {
                    prop_assert!(*dep_pos < position[&i], "n{} reported before n{}", i, dep);
                }
            }
        }
    }

    #[test]
    fn prop_failures_propagate_without_running_dependents(dag in dag_strategy()) {
        let built = build(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();
        let failed: HashSet<usize> = runs
            .iter()
            .filter(|r| r.result.is_fail())
            .map(|r| index_of(r.test.identity()))
            .collect();
        let calls: HashSet<usize> = built.calls.lock().unwrap().iter().copied().collect();

        for run in &runs {
            let i = index_of(run.test.identity());
            if dag.deps[i].iter().any(|d| failed.contains(d)) {
                prop_assert_eq!(run.failure_name(), Some("failed dependency"));
                prop_assert!(!calls.contains(&i));
            }
        }
    }

    #[test]
    fn prop_cyclic_graphs_run_each_identity_at_most_once(dag in graph_strategy()) {
        let built = build_graph(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();

        let mut seen = HashSet::new();
        for run in &runs {
            prop_assert!(seen.insert(index_of(run.test.identity())));
        }

        let calls = built.calls.lock().unwrap();
        let unique: HashSet<_> = calls.iter().collect();
        prop_assert_eq!(unique.len(), calls.len());
    }

    #[test]
    fn prop_cyclic_graphs_never_invoke_invalidated_tests(dag in graph_strategy()) {
        let built = build_graph(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();
        let calls: HashSet<usize> = built.calls.lock().unwrap().iter().copied().collect();

        for run in &runs {
            let i = index_of(run.test.identity());
            let invalidated = run
                .result
                .failure
                .as_ref()
                .is_some_and(|failure| failure.is_harness());
            prop_assert_eq!(calls.contains(&i), !invalidated, "n{}", i);
        }
    }

    #[test]
    fn prop_plan_and_engine_agree_on_cycles(dag in graph_strategy()) {
        let built = build_graph(&dag, false);
        let request = requested(&dag, &built);

        let planned_cycle = Plan::expand(&request, &()).is_err();
        let engine_cycle = run_tests(&(), request)
            .any(|r| r.failure_name() == Some("dependency cycle detected"));

        prop_assert_eq!(planned_cycle, engine_cycle);
    }

    #[test]
    fn prop_passing_tests_follow_passing_dependencies(dag in graph_strategy()) {
        let built = build_graph(&dag, true);
        let runs: Vec<_> = run_tests(&(), requested(&dag, &built)).collect();
        let outcome: HashMap<usize, (usize, bool)> = runs
            .iter()
            .enumerate()
            .map(|(pos, r)| (index_of(r.test.identity()), (pos, r.result.is_pass())))
            .collect();

        for (pos, run) in runs.iter().enumerate().filter(|(_, r)| r.result.is_pass()) {
            let i = index_of(run.test.identity());
            for dep in &dag.deps[i] {
                let (dep_pos, dep_passed) = outcome.get(dep).copied().unwrap_or((usize::MAX, false));
                prop_assert!(dep_passed && dep_pos < pos, "n{} passed before n{}", i, dep);
            }
        }
    }
}
