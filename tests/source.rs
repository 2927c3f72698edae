//! End-to-end scenarios against a fresh [`Engine`], exercising the outer
//! interpreter the way a user typing at the REPL would — one line at a
//! time, checking what landed on the data stack rather than scraping
//! stdout.

use forth_core::cells::BoundsMode;
use forth_core::dictionary;
use forth_core::engine::EngineConfig;
use forth_core::error::ForthError;
use forth_core::outer;
use forth_core::Engine;

fn fresh() -> Engine {
    Engine::new(EngineConfig {
        cell_count: 1 << 16,
        string_count: 1 << 16,
        bounds_mode: BoundsMode::Guarded,
    })
    .unwrap()
}

fn run(engine: &mut Engine, line: &str) {
    engine.load_tib(line).unwrap();
    outer::eval(engine).unwrap();
}

fn try_run(engine: &mut Engine, line: &str) -> Result<(), ForthError> {
    engine.load_tib(line).unwrap();
    outer::eval(engine)
}

#[test]
fn arithmetic_expression() {
    let mut e = fresh();
    run(&mut e, "1 2 3 + *");
    assert_eq!(e.pop().unwrap(), 5);
    assert_eq!(e.depth(), 0);
}

#[test]
fn colon_definition_matches_its_body() {
    let mut e = fresh();
    run(&mut e, ": sq dup * ;");
    run(&mut e, "7 sq");
    assert_eq!(e.pop().unwrap(), 49);
}

#[test]
fn colon_word_calling_another_colon_word_runs_to_completion() {
    let mut e = fresh();
    run(&mut e, ": a 1 ; : b a a + ;");
    run(&mut e, "b");
    assert_eq!(e.pop().unwrap(), 2);
    assert_eq!(e.depth(), 0);
}

#[test]
fn colon_word_is_equivalent_to_inlining_its_body() {
    let mut e = fresh();
    run(&mut e, ": double dup + ;");
    run(&mut e, "3 double");
    let via_word = e.pop().unwrap();
    run(&mut e, "3 dup +");
    let inlined = e.pop().unwrap();
    assert_eq!(via_word, inlined);
}

#[test]
fn begin_until_loop() {
    let mut e = fresh();
    run(&mut e, ": cnt 0 begin 1+ dup 3 = until ;");
    run(&mut e, "cnt");
    assert_eq!(e.pop().unwrap(), 3);
}

#[test]
fn do_loop_counts_up() {
    let mut e = fresh();
    run(&mut e, ": r 5 0 do i loop ;");
    run(&mut e, "r");
    let mut seen = Vec::new();
    while e.depth() > 0 {
        seen.push(e.pop().unwrap());
    }
    seen.reverse();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn for_next_counts_down_through_zero() {
    let mut e = fresh();
    run(&mut e, ": r2 4 for i next ;");
    run(&mut e, "r2");
    let mut seen = Vec::new();
    while e.depth() > 0 {
        seen.push(e.pop().unwrap());
    }
    seen.reverse();
    assert_eq!(seen, vec![4, 3, 2, 1, 0]);
}

#[test]
fn case_of_endof_endcase() {
    let mut e = fresh();
    run(&mut e, ": f case 1 of 10 endof 2 of 20 endof 99 endcase ;");
    run(&mut e, "1 f");
    assert_eq!(e.pop().unwrap(), 10);
    run(&mut e, "2 f");
    assert_eq!(e.pop().unwrap(), 20);
    run(&mut e, "3 f");
    assert_eq!(e.pop().unwrap(), 99);
}

#[test]
fn variable_store_and_fetch_and_plus_store() {
    let mut e = fresh();
    run(&mut e, "variable v 0 v ! 5 v +! v @");
    assert_eq!(e.pop().unwrap(), 5);
}

#[test]
fn abort_quote_raises_and_leaves_positive_path_untouched() {
    let mut e = fresh();
    run(&mut e, ": chk dup 0 < abort\" negative\" ;");

    run(&mut e, "5 chk");
    assert_eq!(e.pop().unwrap(), 5);

    let err = try_run(&mut e, "-1 chk").unwrap_err();
    assert!(matches!(err, ForthError::UserAbort(ref msg) if msg == "negative"));
}

#[test]
fn clean_line_leaves_interpret_state_and_empty_control_stack() {
    let mut e = fresh();
    run(&mut e, ": sq dup * ; 6 sq");
    assert_eq!(e.state().unwrap(), 0);
    assert!(e.control_stack.is_empty());
    assert_eq!(e.pop().unwrap(), 36);
}

#[test]
fn here_advances_on_definition_and_forget_rewinds_it() {
    let mut e = fresh();
    let before = e.cells.here;
    run(&mut e, ": throwaway 1 2 3 ;");
    let after = e.cells.here;
    assert!(after > before);

    run(&mut e, "forget throwaway");
    assert_eq!(e.cells.here, before);
}

#[test]
fn dictionary_walk_terminates_and_shadows_correctly() {
    let mut e = fresh();
    run(&mut e, ": a 1 ; : b 2 ; : a 3 ;");
    let context = e.context().unwrap();
    let names = dictionary::walk_names(&e.cells, &e.strings, context).unwrap();
    // Most recent first; both `a` definitions are still present (shadowing
    // doesn't erase history), and the walk terminates instead of looping.
    assert_eq!(&names[0..3], &["a", "b", "a"]);

    run(&mut e, "a");
    assert_eq!(e.pop().unwrap(), 3, "the newer `a` should shadow the older one");
}

#[test]
fn number_conversion_respects_base() {
    let mut e = fresh();
    run(&mut e, "16 base !");
    run(&mut e, "ff");
    assert_eq!(e.pop().unwrap(), 255);
}

#[test]
fn unknown_word_aborts_the_line_and_clears_the_stack() {
    let mut e = fresh();
    run(&mut e, "1 2 3");
    let err = try_run(&mut e, "not-a-real-word").unwrap_err();
    assert!(matches!(err, ForthError::Lookup(_)));
    e.abort(&err);
    assert_eq!(e.depth(), 0);
}
