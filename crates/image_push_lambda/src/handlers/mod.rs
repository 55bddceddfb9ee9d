pub mod image_push;
