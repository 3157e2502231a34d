pub mod changes;
pub mod dockerfile;
pub mod image;
pub mod version;

pub use changes::ChangedDockerfile;
pub use dockerfile::DockerfileLocation;
pub use image::ImageRef;
