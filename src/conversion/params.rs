//! Argument lists for queued statements.

use super::Value;

/// Trait for turning a caller's argument list into owned values.
///
/// Implemented for `()`, tuples of up to 12 `Into<Value>` elements,
/// `Vec<Value>` and `&[Value]`.
pub trait ToParams {
    /// Convert into the ordered argument list.
    fn into_values(self) -> Vec<Value>;
}

impl ToParams for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl ToParams for Vec<Value> {
    fn into_values(self) -> Vec<Value> {
        self
    }
}

impl ToParams for &[Value] {
    fn into_values(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl<const N: usize> ToParams for [Value; N] {
    fn into_values(self) -> Vec<Value> {
        self.into()
    }
}

macro_rules! impl_to_params_tuple {
    ($($T:ident),+) => {
        impl<$($T: Into<Value>),+> ToParams for ($($T,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($T,)+) = self;
                vec![$($T.into()),+]
            }
        }
    };
}

impl_to_params_tuple!(T1);
impl_to_params_tuple!(T1, T2);
impl_to_params_tuple!(T1, T2, T3);
impl_to_params_tuple!(T1, T2, T3, T4);
impl_to_params_tuple!(T1, T2, T3, T4, T5);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_to_params_tuple!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
