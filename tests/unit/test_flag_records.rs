use flagprobe::harness::{replay, RecordingSeam, SeamEvent};
use flagprobe::models::{ActionKind, FlagManifest, FlagRecordBuilder, OptionObservation};
use serde_json::json;

fn option(name: &str, action: ActionKind) -> OptionObservation {
    OptionObservation::new(vec![name.to_string()], action)
}

#[test]
fn learning_rate_flag() {
    let observation = OptionObservation::new(
        vec!["-l".to_string(), "--learning-rate".to_string()],
        ActionKind::Store,
    )
    .with_default(json!(0.01))
    .with_help("Learning rate");

    let spec = FlagRecordBuilder::build(&observation).unwrap();

    assert_eq!(spec.name, "learning-rate");
    assert_eq!(spec.default, Some(json!(0.01)));
    assert_eq!(spec.description.as_deref(), Some("Learning rate"));
    assert!(!spec.required);
    assert!(spec.switch_polarity.is_none());
}

#[test]
fn store_true_switch() {
    let observation = option("--verbose", ActionKind::StoreTrue).with_default(json!(false));
    let spec = FlagRecordBuilder::build(&observation).unwrap();

    assert_eq!(spec.switch_polarity, Some(true));
    assert!(spec.default.is_none());
}

#[test]
fn store_false_switch_keeps_unusual_default() {
    let observation = option("--no-cache", ActionKind::StoreFalse).with_default(json!(false));
    let spec = FlagRecordBuilder::build(&observation).unwrap();

    assert_eq!(spec.switch_polarity, Some(false));
    assert_eq!(spec.default, Some(json!(false)));
}

#[test]
fn short_only_and_help_options_are_skipped() {
    assert!(FlagRecordBuilder::build(&option("-v", ActionKind::StoreTrue)).is_none());
    assert!(FlagRecordBuilder::build(&option("--help", ActionKind::Help)).is_none());
    assert!(FlagRecordBuilder::build(&option("--version", ActionKind::Version)).is_none());
}

#[test]
fn choices_are_deduplicated_in_order() {
    let observation = option("--optimizer", ActionKind::Store)
        .with_choices(vec![json!("sgd"), json!("adam"), json!("sgd")])
        .required();
    let spec = FlagRecordBuilder::build(&observation).unwrap();

    assert_eq!(spec.choices, Some(vec![json!("sgd"), json!("adam")]));
    assert!(spec.required);
}

#[test]
fn later_registration_replaces_earlier() {
    let events = vec![
        SeamEvent::Register {
            option: option("--epochs", ActionKind::Store).with_default(json!(1)),
        },
        SeamEvent::Register {
            option: option("--epochs", ActionKind::Store).with_default(json!(5)),
        },
        SeamEvent::Parse,
    ];

    let mut seam = RecordingSeam::new();
    replay(events, &mut seam);
    let manifest = seam.finish().unwrap();

    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get("epochs").unwrap().default, Some(json!(5)));
}

#[test]
fn unfinished_recording_has_no_manifest() {
    let events = vec![SeamEvent::Register {
        option: option("--epochs", ActionKind::Store),
    }];

    let mut seam = RecordingSeam::new();
    replay(events, &mut seam);
    assert!(seam.finish().is_none());
}

#[test]
fn manifest_json_shape() {
    let mut seam = RecordingSeam::new();
    replay(
        vec![
            SeamEvent::Register {
                option: option("--verbose", ActionKind::StoreTrue).with_default(json!(false)),
            },
            SeamEvent::Register {
                option: option("--data", ActionKind::Store).required(),
            },
            SeamEvent::Register {
                option: option("--epochs", ActionKind::Store)
                    .with_default(json!(10))
                    .with_help("Number of epochs"),
            },
            SeamEvent::Parse,
        ],
        &mut seam,
    );
    let manifest = seam.finish().unwrap();

    let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "data": {"required": true},
            "epochs": {"description": "Number of epochs", "default": 10},
            "verbose": {"arg-switch": true},
        })
    );

    let reloaded = FlagManifest::from_json(&manifest.to_json().unwrap()).unwrap();
    assert_eq!(reloaded, manifest);
    assert_eq!(reloaded.get("data").unwrap().name, "data");
}
