pub mod lbph_recognizer;
