use proptest::prelude::*;
use review_agreement::{
    normalize::{Label, normalize, normalize_text, renormalize},
    value::CellValue,
};

#[test]
fn numbers_follow_text_rules() {
    assert_eq!(normalize(&CellValue::Number(1.0)), Label::True);
    assert_eq!(normalize(&CellValue::Number(0.0)), Label::False);
    assert_eq!(normalize(&CellValue::Number(2.5)), Label::Other("2.5".into()));
}

#[test]
fn null_sentinel_differs_from_null_text() {
    assert_eq!(normalize(&CellValue::Null), Label::Null);
    assert_eq!(
        normalize(&CellValue::from("null")),
        Label::Other("NULL".into())
    );
    assert_ne!(normalize(&CellValue::from("null")), Label::Null);
}

#[test]
fn raw_csv_cells_normalize_like_their_text() {
    let tokens = ["", "NA"];
    for (raw, expected) in [
        (" yes ", Label::True),
        ("No", Label::False),
        ("true", Label::True),
        ("1", Label::True),
        ("0", Label::False),
        ("NA", Label::Null),
        ("unclear", Label::Other("UNCLEAR".into())),
    ] {
        assert_eq!(normalize(&CellValue::from_raw(raw, &tokens)), expected, "{raw:?}");
    }
}

fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        any::<bool>().prop_map(CellValue::Bool),
        (-3i32..3).prop_map(|n| CellValue::Number(f64::from(n))),
        "[ a-zA-Z0-9]{0,12}".prop_map(CellValue::Text),
        prop_oneof![Just("yes"), Just(" NO "), Just("True"), Just("0"), Just("1")]
            .prop_map(CellValue::from),
    ]
}

proptest! {
    #[test]
    fn normalization_is_idempotent(cell in cell_strategy()) {
        let label = normalize(&cell);
        prop_assert_eq!(renormalize(&label), label.clone());
        if let Some(text) = label.as_str() {
            prop_assert_eq!(normalize_text(text), label.clone());
            prop_assert_eq!(normalize(&CellValue::from(text)), label);
        }
    }
}
