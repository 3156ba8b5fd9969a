// Tests for forward evaluation, losses, regularizers, scoring and persistence.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use laminar::regularizers;
use laminar::{
    Autoencoder, Batch, Classifier, LayerSpec, Matrix, NetError, Network, NetworkKind, NetworkSpec,
    Regressor, Target,
};

fn m(rows: &[&[f64]]) -> Matrix {
    Matrix::from_data(rows.iter().map(|r| r.to_vec()).collect())
}

/// A 2 -> 1 linear regressor computing x0 + 2·x1 + 0.5.
fn line() -> Network {
    let spec: NetworkSpec = serde_json::from_str(r#"{"name": "line", "layers": [2, 1]}"#).unwrap();
    let mut net = Network::build(&spec).unwrap();
    net.find_mut("out", "w").unwrap().value = m(&[&[1.0], &[2.0]]);
    net.find_mut("out", "b").unwrap().value = m(&[&[0.5]]);
    net
}

fn line_batch() -> Batch {
    Batch::new(m(&[&[1.0, 1.0], &[0.0, 0.0]]), Target::Values(m(&[&[4.5], &[0.5]])))
}

#[test]
fn forward_pass_publishes_every_output() {
    let net = line();
    let outputs = net.feed_forward(&m(&[&[1.0, 1.0], &[0.0, 0.0]])).unwrap();
    let keys: Vec<&str> = outputs.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["in:out", "out:out", "out:pre", "x"]);
    assert_eq!(outputs["out:out"], m(&[&[3.5], &[0.5]]));
}

#[test]
fn wrong_input_width_is_rejected() {
    let err = line().predict(&Matrix::zeros(1, 3)).unwrap_err();
    assert!(matches!(err, NetError::ShapeMismatch { expected: 2, actual: 3, .. }));
}

#[test]
fn mse_loss_and_monitors() {
    let net = line();
    let mut rng = StdRng::seed_from_u64(1);
    assert_relative_eq!(net.loss(&line_batch(), &[], &mut rng).unwrap(), 0.5);

    let values = net.monitors(&line_batch(), &[], &mut rng).unwrap();
    let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["loss", "err"]);
}

#[test]
fn alternative_losses() {
    let mut net = line();
    let mut rng = StdRng::seed_from_u64(1);
    net.set_loss("mae").unwrap();
    assert_relative_eq!(net.loss(&line_batch(), &[], &mut rng).unwrap(), 0.5);

    // huber: 0.5·1² for the first row, 0 for the second
    net.set_loss("huber").unwrap();
    assert_relative_eq!(net.loss(&line_batch(), &[], &mut rng).unwrap(), 0.25);

    // two loss terms add with their weights
    net.set_loss("mse").unwrap();
    net.add_loss("mae", 2.0).unwrap();
    assert_relative_eq!(net.loss(&line_batch(), &[], &mut rng).unwrap(), 1.5);
}

#[test]
fn weighted_losses_read_batch_weights() {
    let spec: NetworkSpec =
        serde_json::from_str(r#"{"name": "w", "layers": [2, 1], "weighted": true}"#).unwrap();
    let mut net = Network::build(&spec).unwrap();
    net.find_mut("out", "w").unwrap().value = m(&[&[1.0], &[2.0]]);
    net.find_mut("out", "b").unwrap().value = m(&[&[0.5]]);
    let mut rng = StdRng::seed_from_u64(1);

    let err = net.loss(&line_batch(), &[], &mut rng).unwrap_err();
    assert!(matches!(err, NetError::MissingTarget { .. }));

    let batch = line_batch().with_weights(m(&[&[0.0], &[1.0]]));
    assert_relative_eq!(net.loss(&batch, &[], &mut rng).unwrap(), 0.0);
    let batch = line_batch().with_weights(m(&[&[3.0], &[1.0]]));
    assert_relative_eq!(net.loss(&batch, &[], &mut rng).unwrap(), 0.75);
}

#[test]
fn weight_penalties_add_to_the_loss() {
    let net = line();
    let mut rng = StdRng::seed_from_u64(1);

    let l2 = vec![regularizers::build("weight_l2", None, 0.1).unwrap()];
    assert_relative_eq!(net.loss(&line_batch(), &l2, &mut rng).unwrap(), 0.5 + 0.25);

    let l1 = vec![regularizers::build("weight_l1", None, 0.1).unwrap()];
    assert_relative_eq!(net.loss(&line_batch(), &l1, &mut rng).unwrap(), 0.5 + 0.15);

    // a pattern can pick out biases too
    let bias = vec![regularizers::build("weight_l2", Some("*.b"), 1.0).unwrap()];
    assert_relative_eq!(net.loss(&line_batch(), &bias, &mut rng).unwrap(), 0.5 + 0.25);

    let values = net.monitors(&line_batch(), &l2, &mut rng).unwrap();
    assert_eq!(values[2].0, "weight_l2");
    assert_relative_eq!(values[2].1, 0.25);
    assert_relative_eq!(values[0].1, 0.75);
}

/// 2 -> 2 (linear) -> 1 with a diagonal hidden weight.
fn stacked() -> Network {
    let spec: NetworkSpec = serde_json::from_str(
        r#"{"name": "s", "layers": [2, {"size": 2, "activation": "linear"}, 1],
            "monitors": {"hid1:out": ["<0", ">2.5"]}}"#,
    )
    .unwrap();
    let mut net = Network::build(&spec).unwrap();
    net.find_mut("hid1", "w").unwrap().value = m(&[&[2.0, 0.0], &[0.0, 3.0]]);
    net.find_mut("hid1", "b").unwrap().value = m(&[&[0.0, 0.0]]);
    net.find_mut("out", "w").unwrap().value = m(&[&[1.0], &[1.0]]);
    net.find_mut("out", "b").unwrap().value = m(&[&[0.0]]);
    net
}

fn stacked_batch() -> Batch {
    Batch::new(m(&[&[1.0, -1.0]]), Target::Values(m(&[&[-1.0]])))
}

#[test]
fn hidden_penalties_read_hidden_outputs() {
    let net = stacked();
    let mut rng = StdRng::seed_from_u64(1);
    // hid1:out = [2, -3], out = -1 matches the target
    let l1 = vec![regularizers::build("hidden_l1", None, 0.2).unwrap()];
    assert_relative_eq!(net.loss(&stacked_batch(), &l1, &mut rng).unwrap(), 0.2 * 2.5);
    let l2 = vec![regularizers::build("hidden_l2", None, 1.0).unwrap()];
    assert_relative_eq!(net.loss(&stacked_batch(), &l2, &mut rng).unwrap(), 6.5);
}

#[test]
fn contractive_penalty_is_squared_jacobian_norm() {
    let net = stacked();
    let mut rng = StdRng::seed_from_u64(1);
    let regs = vec![regularizers::build("contractive", None, 1.0).unwrap()];
    let loss = net.loss(&stacked_batch(), &regs, &mut rng).unwrap();
    assert_relative_eq!(loss, 4.0 + 9.0, epsilon = 1e-5);
}

#[test]
fn threshold_monitors_follow_penalties() {
    let net = stacked();
    let mut rng = StdRng::seed_from_u64(1);
    let values = net.monitors(&stacked_batch(), &[], &mut rng).unwrap();
    let named: BTreeMap<String, f64> = values.into_iter().collect();
    assert_eq!(named["hid1:out<0"], 0.5);
    assert_eq!(named["hid1:out>2.5"], 0.0);
}

#[test]
fn noise_and_dropout_perturb_the_forward_pass() {
    let net = stacked();
    let mut rng = StdRng::seed_from_u64(1);
    let clean = net.loss(&stacked_batch(), &[], &mut rng).unwrap();

    let noise = vec![regularizers::build("hidden_noise", None, 0.5).unwrap()];
    let noisy = net.loss(&stacked_batch(), &noise, &mut rng).unwrap();
    assert_ne!(clean, noisy);

    // same seed, same noise
    let a = net.loss(&stacked_batch(), &noise, &mut StdRng::seed_from_u64(7)).unwrap();
    let b = net.loss(&stacked_batch(), &noise, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a, b);

    // plain feed_forward ignores them
    assert_eq!(net.predict(&stacked_batch().inputs).unwrap(), m(&[&[-1.0]]));

    // graph-modifying regularizers add no penalty entry
    let mixed = vec![
        regularizers::build("hidden_noise", None, 0.5).unwrap(),
        regularizers::build("weight_l2", None, 0.1).unwrap(),
    ];
    let values = net.monitors(&stacked_batch(), &mixed, &mut rng).unwrap();
    let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(&names[..3], &["loss", "err", "weight_l2"]);
    assert!(!names.contains(&"hidden_noise"));

    assert!(matches!(
        regularizers::build("hidden_dropout", None, 1.0),
        Err(NetError::Config(_))
    ));
    assert!(matches!(regularizers::build("input_noise", None, -0.1), Err(NetError::Config(_))));
}

#[test]
fn spec_regularizers_are_attached() {
    let spec: NetworkSpec = serde_json::from_str(
        r#"{"name": "r", "layers": [2, 3, 1],
            "regularizers": {"weight_l2": 0.01, "hidden_dropout": {"hid1:out": 0.5}, "input_noise": 0}}"#,
    )
    .unwrap();
    let net = Network::build(&spec).unwrap();
    let regs = net.regularizers().unwrap();
    let names: Vec<&str> = regs.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["weight_l2", "hidden_dropout"]);
}

fn confident_classifier() -> Classifier {
    let mut net = Classifier::new(vec![LayerSpec::Size(3), LayerSpec::Size(3)]).unwrap();
    net.find_mut("out", "w").unwrap().value = Matrix::zeros(3, 3);
    net.find_mut("out", "b").unwrap().value = m(&[&[0.0, 0.0, 10.0]]);
    net
}

#[test]
fn classifier_predicts_and_scores() {
    let net = confident_classifier();
    let x = m(&[&[1.0, 2.0, 3.0], &[-1.0, 0.0, 4.0]]);
    assert_eq!(net.classify(&x).unwrap(), vec![2, 2]);
    let probs = net.predict_proba(&x).unwrap();
    assert_relative_eq!(probs.data[0].iter().sum::<f64>(), 1.0, epsilon = 1e-12);

    let right = Batch::new(x.clone(), Target::Labels(vec![2, 2]));
    let half = Batch::new(x.clone(), Target::Labels(vec![2, 0]));
    assert_eq!(net.score(&right).unwrap(), 1.0);
    assert_eq!(net.score(&half).unwrap(), 0.5);

    let mut rng = StdRng::seed_from_u64(1);
    let values = net.monitors(&half, &[], &mut rng).unwrap();
    assert_eq!(values[2], ("acc".to_string(), 0.5));
    let expected_xe = -(probs.data[0][2].ln() + probs.data[1][0].ln()) / 2.0;
    assert_relative_eq!(values[1].1, expected_xe, epsilon = 1e-9);

    let bad = Batch::new(x.clone(), Target::Labels(vec![2, 3]));
    assert!(net.loss(&bad, &[], &mut rng).is_err());
    let unlabeled = Batch::new(x, Target::None);
    assert!(matches!(net.score(&unlabeled), Err(NetError::MissingTarget { .. })));
}

#[test]
fn hinge_loss_on_class_scores() {
    let mut net = confident_classifier();
    net.set_loss("hinge").unwrap();
    let x = m(&[&[0.0, 0.0, 0.0]]);
    let p = net.predict_proba(&x).unwrap().data[0].clone();
    let mut rng = StdRng::seed_from_u64(1);

    let right = Batch::new(x.clone(), Target::Labels(vec![2]));
    let expected = 2.0 * (1.0 + p[0] - p[2]);
    assert_relative_eq!(net.loss(&right, &[], &mut rng).unwrap(), expected, epsilon = 1e-12);

    let wrong = Batch::new(x, Target::Labels(vec![0]));
    let expected = (1.0 + p[1] - p[0]) + (1.0 + p[2] - p[0]);
    assert_relative_eq!(net.loss(&wrong, &[], &mut rng).unwrap(), expected, epsilon = 1e-12);
}

fn tiny_autoencoder() -> Autoencoder {
    let spec: NetworkSpec = serde_json::from_str(
        r#"{"name": "ae", "kind": "autoencoder", "layers": [2, {"size": 1, "activation": "linear"}, ["tied"]]}"#,
    )
    .unwrap();
    let mut net = Autoencoder::from_spec(&spec).unwrap();
    net.find_mut("hid1", "w").unwrap().value = m(&[&[1.0], &[1.0]]);
    net
}

#[test]
fn autoencoder_encodes_and_decodes_through_tied_weights() {
    let net = tiny_autoencoder();
    let code = net.encode(&m(&[&[1.0, 2.0]]), None).unwrap();
    assert_eq!(code, m(&[&[3.0]]));
    assert_eq!(net.encode(&m(&[&[1.0, 2.0]]), Some("hid1:pre")).unwrap(), code);
    assert_eq!(net.decode(&code, None).unwrap(), m(&[&[3.0, 3.0]]));
    assert!(matches!(net.decode(&m(&[&[1.0, 1.0]]), None), Err(NetError::ShapeMismatch { .. })));
}

#[test]
fn autoencoder_scores_reconstruction() {
    let net = tiny_autoencoder();
    // [1, 1] reconstructs as [2, 2]; [0, 0] exactly
    let batch = Batch::new(m(&[&[1.0, 1.0], &[0.0, 0.0]]), Target::None);
    let mut rng = StdRng::seed_from_u64(1);
    assert_relative_eq!(net.loss(&batch, &[], &mut rng).unwrap(), 0.5);
    // mean 0.5, ss_tot 1, ss_res 2
    assert_relative_eq!(net.score(&batch).unwrap(), -1.0);
}

#[test]
fn regressor_score_is_r_squared() {
    let net = Regressor::from_network(line()).unwrap();
    let exact = Batch::new(m(&[&[1.0, 1.0], &[0.0, 0.0]]), Target::Values(m(&[&[3.5], &[0.5]])));
    assert_eq!(net.score(&exact).unwrap(), 1.0);
    // mean 2.5, ss_tot 8, ss_res 1
    assert_relative_eq!(net.score(&line_batch()).unwrap(), 1.0 - 1.0 / 8.0);
}

#[test]
fn weighted_scores() {
    let net = Regressor::from_network(line()).unwrap();
    // weighted mean 3.5, ss_tot 3·1 + 1·9, ss_res 3·1
    let batch = line_batch().with_weights(m(&[&[3.0], &[1.0]]));
    assert_relative_eq!(net.score(&batch).unwrap(), 0.75);

    let clf = confident_classifier();
    let x = m(&[&[1.0, 2.0, 3.0], &[-1.0, 0.0, 4.0]]);
    let batch = Batch::new(x, Target::Labels(vec![2, 0])).with_weights(m(&[&[3.0], &[1.0]]));
    assert_relative_eq!(clf.score(&batch).unwrap(), 0.75);
}

#[test]
fn misshaped_score_weights_are_rejected() {
    let net = Regressor::new(vec![LayerSpec::Size(2), LayerSpec::Size(2)]).unwrap();
    let batch = Batch::new(Matrix::zeros(2, 2), Target::Values(Matrix::zeros(2, 2)));

    let narrow = batch.clone().with_weights(Matrix::filled(2, 1, 1.0));
    assert!(matches!(net.score(&narrow), Err(NetError::ShapeMismatch { expected: 2, actual: 1, .. })));
    let tall = batch.with_weights(Matrix::filled(3, 2, 1.0));
    assert!(matches!(net.score(&tall), Err(NetError::ShapeMismatch { expected: 2, actual: 3, .. })));

    let clf = confident_classifier();
    let batch = Batch::new(Matrix::zeros(2, 3), Target::Labels(vec![2, 2])).with_weights(Matrix::zeros(2, 0));
    assert!(matches!(clf.score(&batch), Err(NetError::ShapeMismatch { .. })));
}

#[test]
fn overwritten_parameters_are_shape_checked() {
    let x = Matrix::zeros(1, 2);
    let mut net = line();
    net.find_mut("out", "w").unwrap().value = Matrix::zeros(3, 2);
    assert!(matches!(net.predict(&x), Err(NetError::ShapeMismatch { expected: 2, actual: 3, .. })));

    let mut net = line();
    net.find_mut("out", "b").unwrap().value = Matrix::zeros(1, 2);
    assert!(matches!(net.predict(&x), Err(NetError::ShapeMismatch { expected: 1, actual: 2, .. })));

    // the tied decoder reads its partner's weights
    let mut ae = tiny_autoencoder();
    ae.find_mut("hid1", "w").unwrap().value = Matrix::zeros(2, 2);
    assert!(matches!(ae.decode(&m(&[&[3.0]]), None), Err(NetError::ShapeMismatch { .. })));
    assert!(matches!(ae.predict(&x), Err(NetError::ShapeMismatch { .. })));

    let mut ae = tiny_autoencoder();
    ae.find_mut("out", "b").unwrap().value = Matrix::zeros(1, 3);
    assert!(matches!(ae.predict(&x), Err(NetError::ShapeMismatch { expected: 2, actual: 3, .. })));
}

#[test]
fn saved_networks_reload_with_their_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line.json");
    let path = path.to_str().unwrap();

    let net = line();
    net.save_json(path).unwrap();
    let loaded = Network::load_json(path).unwrap();
    assert_eq!(loaded.kind(), NetworkKind::Regressor);
    assert_eq!(loaded.find("out", "w").unwrap(), net.find("out", "w").unwrap());
    let x = m(&[&[0.25, -3.0]]);
    assert_eq!(loaded.predict(&x).unwrap(), net.predict(&x).unwrap());
    assert_eq!(loaded.losses().collect::<Vec<_>>(), net.losses().collect::<Vec<_>>());

    assert!(matches!(Classifier::load_json(path), Err(NetError::Config(_))));
    assert!(Regressor::load_json(path).is_ok());
}

#[test]
fn tied_autoencoders_survive_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ae.json");
    let path = path.to_str().unwrap();

    let net = tiny_autoencoder();
    net.save_json(path).unwrap();
    let loaded = Autoencoder::load_json(path).unwrap();
    let x = m(&[&[1.0, 2.0]]);
    assert_eq!(loaded.encode(&x, None).unwrap(), m(&[&[3.0]]));
    assert_eq!(loaded.predict(&x).unwrap(), net.predict(&x).unwrap());
}

#[test]
fn missing_model_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert!(matches!(Network::load_json(path.to_str().unwrap()), Err(NetError::Io(_))));
}

/// Mean of the raw output values; ignores the target.
struct OutputMean {
    output: String,
}

impl laminar::Loss for OutputMean {
    fn name(&self) -> &str {
        "test_output_mean"
    }

    fn output_name(&self) -> &str {
        &self.output
    }

    fn weighted(&self) -> bool {
        false
    }

    fn evaluate(&self, outputs: &laminar::layers::Outputs, _batch: &Batch) -> laminar::Result<f64> {
        outputs
            .get(&self.output)
            .map(|m| m.mean())
            .ok_or_else(|| NetError::MissingOutput { name: self.output.clone() })
    }
}

#[test]
fn custom_losses_plug_in_by_name() {
    laminar::register_loss("test_output_mean", |output: &str, _weighted: bool| {
        Box::new(OutputMean { output: output.to_string() }) as Box<dyn laminar::Loss>
    })
    .unwrap();
    assert!(laminar::register_loss("mse", |output: &str, _weighted: bool| {
        Box::new(OutputMean { output: output.to_string() }) as Box<dyn laminar::Loss>
    })
    .is_err());

    let mut net = line();
    net.set_loss("test_output_mean").unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    // outputs 3.5 and 0.5
    assert_relative_eq!(net.loss(&line_batch(), &[], &mut rng).unwrap(), 2.0);
}

#[test]
fn probability_losses() {
    let spec: NetworkSpec = serde_json::from_str(
        r#"{"name": "p", "layers": [1, 2], "output_activation": "softmax", "loss": "kl"}"#,
    )
    .unwrap();
    let mut net = Network::build(&spec).unwrap();
    net.find_mut("out", "w").unwrap().value = m(&[&[0.0, 0.0]]);
    net.find_mut("out", "b").unwrap().value = m(&[&[0.0, 0.0]]);
    let mut rng = StdRng::seed_from_u64(1);

    // the output is [0.5, 0.5]; matching it costs nothing
    let same = Batch::new(m(&[&[1.0]]), Target::Values(m(&[&[0.5, 0.5]])));
    assert_relative_eq!(net.loss(&same, &[], &mut rng).unwrap(), 0.0, epsilon = 1e-9);
    let skewed = Batch::new(m(&[&[1.0]]), Target::Values(m(&[&[1.0, 0.0]])));
    assert!(net.loss(&skewed, &[], &mut rng).unwrap() > 0.0);

    net.set_loss("bxe").unwrap();
    // -ln(0.5) for each of the two entries, averaged
    assert_relative_eq!(net.loss(&skewed, &[], &mut rng).unwrap(), 2f64.ln(), epsilon = 1e-9);
}
