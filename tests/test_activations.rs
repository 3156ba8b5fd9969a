// Tests for activation parsing, composition and the custom registry.

use approx::assert_relative_eq;
use laminar::{register_activation, register_elementwise, Activation, Matrix, NetError};

fn row(values: &[f64]) -> Matrix {
    Matrix::row_vector(values.to_vec())
}

#[test]
fn elementwise_builtins() {
    let x = row(&[-2.0, -0.5, 0.5, 2.0]);
    let cases: [(&str, [f64; 4]); 6] = [
        ("linear", [-2.0, -0.5, 0.5, 2.0]),
        ("relu", [0.0, 0.0, 0.5, 2.0]),
        ("rect:max", [-2.0, -0.5, 0.5, 1.0]),
        ("rect:minmax", [0.0, 0.0, 0.5, 1.0]),
        ("trec", [0.0, 0.0, 0.0, 2.0]),
        ("tlin", [-2.0, 0.0, 0.0, 2.0]),
    ];
    for (name, expected) in cases {
        let y = Activation::build(name).unwrap().apply(&x);
        assert_eq!(y.data[0], expected.to_vec(), "activation {name}");
    }
}

#[test]
fn logistic_and_aliases_agree() {
    let x = row(&[-1.0, 0.0, 3.0]);
    let a = Activation::build("logistic").unwrap().apply(&x);
    let b = Activation::build("sigmoid").unwrap().apply(&x);
    assert_eq!(a, b);
    assert_relative_eq!(a.data[0][1], 0.5);
}

#[test]
fn softplus_is_stable_for_large_inputs() {
    let y = Activation::build("softplus").unwrap().apply(&row(&[800.0, -800.0, 0.0]));
    assert_relative_eq!(y.data[0][0], 800.0);
    assert_relative_eq!(y.data[0][1], 0.0);
    assert_relative_eq!(y.data[0][2], 2f64.ln());
}

#[test]
fn softmax_rows_sum_to_one() {
    let x = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![1000.0, 1000.0, 1000.0]]);
    let y = Activation::build("softmax").unwrap().apply(&x);
    for r in &y.data {
        assert_relative_eq!(r.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
    assert_relative_eq!(y.data[1][0], 1.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn composition_runs_left_to_right() {
    let y = Activation::build("relu+norm:z").unwrap().apply(&row(&[-1.0, 1.0, 3.0]));
    let mean = y.data[0].iter().sum::<f64>() / 3.0;
    let var = y.data[0].iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
    assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
    assert_relative_eq!(var, 1.0, epsilon = 1e-9);
    // relu zeroed the first entry, so it is the smallest after scaling
    assert!(y.data[0][0] < y.data[0][1]);
}

#[test]
fn norm_max_divides_by_peak_magnitude() {
    let y = Activation::build("norm:max").unwrap().apply(&row(&[-4.0, 2.0]));
    assert_eq!(y.data[0], vec![-1.0, 0.5]);
}

#[test]
fn unknown_stage_is_reported_by_name() {
    match Activation::build("relu+bogus") {
        Err(NetError::UnknownActivation { name }) => assert_eq!(name, "bogus"),
        other => panic!("expected UnknownActivation, got {other:?}"),
    }
}

#[test]
fn custom_activations_compose_with_builtins() {
    register_elementwise("test_double", |x| 2.0 * x).unwrap();
    let y = Activation::build("test_double+relu").unwrap().apply(&row(&[-1.0, 2.0]));
    assert_eq!(y.data[0], vec![0.0, 4.0]);

    register_activation("test_center", |z: &Matrix| {
        z.map_rows(|r| {
            let m = r.iter().sum::<f64>() / r.len() as f64;
            r.iter().map(|x| x - m).collect()
        })
    })
    .unwrap();
    let y = Activation::build("test_center").unwrap().apply(&row(&[1.0, 3.0]));
    assert_eq!(y.data[0], vec![-1.0, 1.0]);
}

#[test]
fn builtin_names_cannot_be_replaced() {
    assert!(register_elementwise("relu", |x| x).is_err());
    assert!(register_elementwise("a+b", |x| x).is_err());
}

#[test]
fn activations_serialize_as_their_expression() {
    let act: Activation = serde_json::from_str("\"tanh+norm:mean\"").unwrap();
    assert_eq!(act.expr(), "tanh+norm:mean");
    assert_eq!(serde_json::to_string(&act).unwrap(), "\"tanh+norm:mean\"");
    assert!(serde_json::from_str::<Activation>("\"nope\"").is_err());
}
