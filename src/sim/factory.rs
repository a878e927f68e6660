//! Entity creation from ground-layer markers

use super::entity::Entity;

/// Turns ground-layer codes into entities when a world is seeded.
///
/// Called once per non-empty ground cell with the cell's top-left pixel.
/// Return `None` for codes that are plain terrain.
pub trait EntityFactory {
    fn create_entity(&mut self, code: u16, pixel_x: i32, pixel_y: i32) -> Option<Box<dyn Entity>>;
}

impl<F> EntityFactory for F
where
    F: FnMut(u16, i32, i32) -> Option<Box<dyn Entity>>,
{
    fn create_entity(&mut self, code: u16, pixel_x: i32, pixel_y: i32) -> Option<Box<dyn Entity>> {
        self(code, pixel_x, pixel_y)
    }
}
