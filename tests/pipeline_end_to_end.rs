use image::{Rgb, RgbImage};
use xunmu::{
  ClassTable, DetectConfig, DetectTask, PipelineError, PredictionMatrix, Rect,
  input::RecordedOutputs,
  model::{DecodeError, NmsParams, decode, suppress},
  output::{AnnotateError, Draw},
};

const NUM_CLASSES: usize = 80;

fn row(bbox: [f32; 4], objectness: f32, scores: &[(usize, f32)]) -> Vec<f32> {
  let mut row = vec![0.0; 5 + NUM_CLASSES];
  row[..4].copy_from_slice(&bbox);
  row[4] = objectness;
  for &(class_id, score) in scores {
    row[5 + class_id] = score;
  }
  row
}

fn two_overlapping_rows() -> PredictionMatrix {
  PredictionMatrix::from_rows(&[
    row([0.5, 0.5, 0.2, 0.2], 0.9, &[(0, 0.95), (1, 0.05)]),
    row([0.51, 0.51, 0.2, 0.2], 0.9, &[(0, 0.90), (1, 0.10)]),
  ])
  .unwrap()
}

fn no_save() -> DetectConfig {
  DetectConfig {
    save: false,
    ..DetectConfig::default()
  }
}

#[test]
fn overlapping_rows_collapse_to_one_detection() {
  let outputs = [two_overlapping_rows()];
  let detections = decode(&outputs, 100, 100, 0.4).unwrap();
  assert_eq!(detections.len(), 2);

  let kept = suppress(&detections, &NmsParams::new(0.4, 0.4));
  assert_eq!(kept.as_slice(), &[0]);

  let best = &detections[0];
  assert_eq!(best.class_id, 0);
  assert_eq!(best.bbox, Rect::new(40, 40, 20, 20));
  let (cx, cy) = best.bbox.center();
  assert!((cx - 50.0).abs() <= 1.0 && (cy - 50.0).abs() <= 1.0);
}

#[test]
fn task_produces_decorated_image_without_disk_io() {
  let task = DetectTask::new(no_save()).unwrap();
  let image = RgbImage::new(100, 100);
  let outcome = task
    .run(&image, &[two_overlapping_rows()], &ClassTable::coco())
    .unwrap();

  assert_eq!(outcome.detections.len(), 2);
  assert_eq!(outcome.kept.len(), 1);
  let kept: Vec<_> = outcome.kept_detections().collect();
  assert_eq!(kept[0].class_id, 0);
  assert!(outcome.saved_to.is_none());

  let cyan = Rgb([0, 255, 255]);
  assert_eq!(*outcome.image.get_pixel(40, 40), cyan);
  assert_eq!(*outcome.image.get_pixel(50, 50), Rgb([0, 0, 0]));
}

#[test]
fn nothing_detected_is_success_not_error() {
  let task = DetectTask::new(no_save()).unwrap();
  let weak = PredictionMatrix::from_rows(&[row([0.5, 0.5, 0.2, 0.2], 0.9, &[(3, 0.2)])]).unwrap();
  let outcome = task
    .run(&RgbImage::new(32, 32), &[weak], &ClassTable::coco())
    .unwrap();
  assert!(outcome.detections.is_empty());
  assert!(outcome.kept.is_empty());
}

#[test]
fn malformed_tensor_is_reported_as_decode_error() {
  let task = DetectTask::new(no_save()).unwrap();
  let short = PredictionMatrix::new(vec![0.5; 10], 10).unwrap();
  let err = task
    .run(&RgbImage::new(32, 32), &[short], &ClassTable::coco())
    .unwrap_err();
  assert!(matches!(
    err,
    PipelineError::Decode(DecodeError::MalformedTensor {
      layer: 0,
      row: 0,
      len: 10,
      expected: 85,
    })
  ));
}

#[test]
fn short_class_table_is_reported_as_annotate_error() {
  let task = DetectTask::new(no_save()).unwrap();
  let classes = ClassTable::new(vec!["person".to_string()]);
  let m = PredictionMatrix::from_rows(&[row([0.5, 0.5, 0.2, 0.2], 0.9, &[(12, 0.9)])]).unwrap();
  let err = task.run(&RgbImage::new(32, 32), &[m], &classes).unwrap_err();
  assert!(matches!(
    err,
    PipelineError::Annotate(AnnotateError::ClassIndexOutOfRange {
      class_id: 12,
      len: 1,
      ..
    })
  ));
}

#[test]
fn saving_writes_png_and_record() {
  let dir = tempfile::tempdir().unwrap();
  let config = DetectConfig {
    output_dir: dir.path().to_path_buf(),
    output_name: Some("street".to_string()),
    record: true,
    ..DetectConfig::default()
  };
  let task = DetectTask::new(config).unwrap();
  let image = RgbImage::new(100, 100);
  let outcome = task
    .run(&image, &[two_overlapping_rows()], &ClassTable::coco())
    .unwrap();

  let saved = outcome.saved_to.clone().unwrap();
  assert_eq!(saved, dir.path().join("street.png"));
  let reloaded = image::open(&saved).unwrap().to_rgb8();
  assert_eq!(reloaded, outcome.image);

  let record = std::fs::read_to_string(outcome.record_to.unwrap()).unwrap();
  assert_eq!(record, "person, 0.9500, 40, 40, 20, 20");
}

#[test]
fn recorded_outputs_drive_the_model_path() {
  let rows: Vec<Vec<f32>> = vec![
    row([0.25, 0.25, 0.1, 0.1], 1.0, &[(2, 0.8)]),
    row([0.75, 0.75, 0.1, 0.1], 1.0, &[(7, 0.6)]),
  ];
  let json = serde_json::to_string(&vec![rows]).unwrap();
  let model = RecordedOutputs::from_reader(json.as_bytes()).unwrap();

  let task = DetectTask::new(no_save()).unwrap().with_draw(Draw::default());
  let outcome = task
    .run_with_model(&model, &RgbImage::new(200, 200), &ClassTable::coco())
    .unwrap();

  let classes: Vec<usize> = outcome.kept_detections().map(|d| d.class_id).collect();
  assert_eq!(classes, vec![2, 7]);
  assert_eq!(outcome.detections[0].bbox, Rect::new(40, 40, 20, 20));
}

#[test]
fn independent_images_can_run_in_parallel() {
  let task = &DetectTask::new(no_save()).unwrap();
  let classes = &ClassTable::coco();
  let outputs = &[two_overlapping_rows()];

  let results: Vec<_> = std::thread::scope(|s| {
    let handles: Vec<_> = (0..4)
      .map(|_| s.spawn(move || task.run(&RgbImage::new(100, 100), outputs, classes)))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  for outcome in results {
    let outcome = outcome.unwrap();
    assert_eq!(outcome.kept.as_slice(), &[0]);
  }
}
