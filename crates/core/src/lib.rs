pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod display {
    pub mod domain {
        pub mod annotation;
        pub mod display_surface;
    }
    pub mod infrastructure;
}

pub mod identity {
    pub mod domain {
        pub mod display_name_cache;
        pub mod identity;
        pub mod identity_store;
    }
    pub mod infrastructure;
}

pub mod recognition {
    pub mod domain {
        pub mod face_normalizer;
        pub mod face_recognizer;
        pub mod face_sample;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod enroll_face_use_case;
    pub mod mode;
    pub mod operator_input;
    pub mod pipeline_controller;
    pub mod pipeline_logger;
    pub mod recognize_faces_use_case;
    pub mod restore_recognizer_use_case;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
}
