mod math;
pub mod onnx_yolo_detector;
