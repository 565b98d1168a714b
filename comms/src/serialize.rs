/// Types that can be written into a frame body.
pub trait Serialize<'a> {
    /// Writes the owned part of `self` into `buf`.
    ///
    /// # Returns
    /// A borrowed tail that must be sent right after `buf`, if any.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
