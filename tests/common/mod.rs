#![allow(dead_code)]

pub mod stub_classifier;
pub mod synthetic_image;
