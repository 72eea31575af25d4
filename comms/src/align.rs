/// Plain numeric types usable as receive buffer elements.
pub trait Align1: bytemuck::Pod {}

/// Buffer elements aligned to at least 4 bytes, so an `f32` payload can be
/// viewed in place after the 4 byte kind header.
pub trait Align4: Align1 {}

macro_rules! impl_align {
    ($marker:ident: $($ty:ty),* $(,)?) => {
        $(impl $marker for $ty {})*
    };
}

impl_align!(Align1: u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
impl_align!(Align4: u32, i32, u64, i64, f32, f64);
