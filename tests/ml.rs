use burn_ndarray::NdArray;

use qpong::ml::{
    ActionSample, DEFAULT_HIDDEN, FEATURES, NetworkMetadata, SampleSet, StateEncoder,
    ValueNetwork,
};
use qpong::{
    ACTIONS, Approximator, Board, DefaultApproximator, DefaultSnapshot, Side, ValueFunction,
};

type Backend = NdArray<f32>;

#[test]
fn encoder_reflects_own_paddle_and_action() {
    let board = Board::builder(300.0, 200.0)
        .with_seed(2)
        .build()
        .expect("board");
    let state = board.state();
    for action in ACTIONS {
        let features = StateEncoder::encode(state, Side::Right, action);
        assert_eq!(features.len(), FEATURES);
        assert_eq!(features[0], state.right.y as f32);
        assert_eq!(features[3], state.ball.position.x as f32);
        assert_eq!(features[7], action as f32);
    }
}

#[test]
fn network_maps_batches_to_one_value_each() {
    let network = ValueNetwork::<Backend>::default();
    let rows = vec![[0.0f32; FEATURES], [1.0f32; FEATURES], [-3.0f32; FEATURES]];
    let output = network.forward(StateEncoder::batch_tensor::<Backend>(&rows));
    assert_eq!(output.shape().dims, [3, 1]);
}

#[test]
fn saved_approximator_loads_as_equivalent_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("value.bin");
    let mut approximator = DefaultApproximator::default();
    let samples: SampleSet = (0..6)
        .map(|idx| {
            let mut features = [0.0f32; FEATURES];
            features[4] = idx as f32 * 10.0;
            ActionSample::new(features, idx as f64)
        })
        .collect::<Vec<_>>()
        .into();
    approximator.train_batch(&samples, 4).expect("train");
    approximator.save(&path).expect("save");

    let snapshot = DefaultSnapshot::load(&path).expect("snapshot");
    let resumed = DefaultApproximator::load(&path).expect("approximator");
    let probe = [80.0, 1.0, 0.25, 120.0, 40.0, -4.0, 3.0, 0.0];
    assert_eq!(snapshot.predict(&probe), approximator.predict(&probe));
    assert_eq!(resumed.predict(&probe), approximator.predict(&probe));
    assert_eq!(
        snapshot.metadata(),
        &NetworkMetadata {
            hidden: DEFAULT_HIDDEN.to_vec(),
            learning_rate: approximator.metadata().learning_rate,
            batches_trained: 1,
            samples_trained: 6,
        }
    );
}

#[test]
fn repeated_fitting_reduces_error() {
    let mut approximator = DefaultApproximator::new(&[16, 8], 1.0e-2).expect("approximator");
    let samples: SampleSet = (0..32)
        .map(|idx| {
            let mut features = [0.0f32; FEATURES];
            features[0] = (idx % 8) as f32;
            features[7] = ACTIONS[idx % 3] as f32;
            ActionSample::new(features, 2.0)
        })
        .collect::<Vec<_>>()
        .into();
    let before = approximator.train_batch(&samples, 0).expect("measure");
    approximator.train_batch(&samples, 300).expect("train");
    let after = approximator.train_batch(&samples, 0).expect("measure");
    assert!(after < before, "error went from {before} to {after}");
}
