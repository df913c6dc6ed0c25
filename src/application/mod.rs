// Application layer - Evaluation cycles and the stream seams they depend on
pub mod evaluation_service;
pub mod operating_time_calculator;
pub mod sample_stream;
