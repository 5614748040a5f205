//! Common macro for implementing numeric row-id wrapper types.

macro_rules! impl_row_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                pub const fn new(id: u32) -> Self {
                    Self(id)
                }

                pub const fn to_u32(self) -> u32 {
                    self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u32> for $name {
                fn from(id: u32) -> Self {
                    Self(id)
                }
            }

            impl From<$name> for u32 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )*
    };
}

pub(crate) use impl_row_id;
