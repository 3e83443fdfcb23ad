use std::sync::Arc;

use proptest::prelude::*;
use seedcalc::calculator::{
    ArithmeticEvaluator, CalculationMode, CalculatorEngine, EngineConfig, EngineState,
    ExpressionEvaluator, Key, Operator, ReplayPhase, format_number,
};

fn typing_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        4 => (0u8..10).prop_map(Key::Digit),
        1 => Just(Key::Dot),
        2 => prop_oneof![
            Just(Operator::Add),
            Just(Operator::Sub),
            Just(Operator::Mul),
            Just(Operator::Div),
        ]
        .prop_map(Key::Operator),
    ]
}

fn any_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        8 => typing_key(),
        1 => Just(Key::LeftParen),
        1 => Just(Key::RightParen),
        1 => Just(Key::Backspace),
        1 => Just(Key::Equal),
        1 => Just(Key::AllClear),
    ]
}

fn engine(mode: CalculationMode) -> CalculatorEngine {
    let config = EngineConfig {
        calculation_mode: mode,
        ..EngineConfig::default()
    };
    CalculatorEngine::with_config(Arc::new(ArithmeticEvaluator), config)
}

fn is_operator(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/')
}

proptest! {
    #[test]
    fn buffer_never_starts_with_operator(keys in prop::collection::vec(typing_key(), 1..45)) {
        let mut engine = engine(CalculationMode::Regular);
        for key in keys {
            engine.handle_input(key);
        }
        let first = engine.buffer_text().chars().next();
        prop_assert!(!first.is_some_and(is_operator), "buffer {:?}", engine.buffer_text());
    }

    #[test]
    fn numerals_have_no_leading_zero(keys in prop::collection::vec(typing_key(), 1..45)) {
        let mut engine = engine(CalculationMode::Regular);
        for key in keys {
            engine.handle_input(key);
        }
        for numeral in engine.buffer_text().split(is_operator) {
            let mut chars = numeral.chars();
            let leading_zero = chars.next() == Some('0')
                && chars.next().is_some_and(|ch| ch.is_ascii_digit());
            prop_assert!(!leading_zero, "buffer {:?}", engine.buffer_text());
        }
    }

    #[test]
    fn engine_stays_consistent(keys in prop::collection::vec(any_key(), 0..80)) {
        let mut engine = engine(CalculationMode::DemoSteps);
        for key in keys {
            engine.handle_input(key);
            if engine.state() == EngineState::Replaying {
                engine.finish_replay();
            }
            prop_assert!(engine.accepting_input());
            prop_assert!(engine.buffer_text().chars().count() <= engine.config().max_chars + 1);
            if engine.state().is_error() {
                prop_assert!(engine.result().is_none());
            }
        }
    }

    #[test]
    fn replay_ends_on_final_value(
        numbers in prop::collection::vec(1u32..1000, 2..6),
        operators in prop::collection::vec(0usize..4, 5),
    ) {
        let mut text = numbers[0].to_string();
        for (number, op) in numbers[1..].iter().zip(&operators) {
            text.push(['+', '-', '*', '/'][*op]);
            text.push_str(&number.to_string());
        }

        let mut engine = engine(CalculationMode::DemoSteps);
        for label in text.chars() {
            engine.handle_input(Key::from_label(&label.to_string()).unwrap());
        }
        engine.handle_input(Key::Equal);
        prop_assert_eq!(engine.state(), EngineState::Replaying);

        let frames = engine.finish_replay();
        let rounds = frames.iter().filter(|f| f.phase == ReplayPhase::Highlight).count();
        prop_assert!(rounds < numbers.len());

        let expected = ArithmeticEvaluator.execute(&text).unwrap().value;
        let last = frames.last().unwrap();
        prop_assert!(last.is_final());
        prop_assert_eq!(&last.expression.text, &format_number(expected));
        prop_assert_eq!(engine.result(), Some(expected));
        prop_assert_eq!(engine.state(), EngineState::Ready);
    }

    #[test]
    fn negative_numbers_format_with_sign(value in 1e-9f64..1e15) {
        prop_assert_eq!(format_number(-value), format!("-{}", format_number(value)));
    }
}
