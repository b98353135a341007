use crate::{Result, RowContract, RowProxy, RowSchema, Value};

/// One or more row contracts read together from a single physical row.
///
/// Implemented for tuples `(A,)` up to `(A, B, C, D)`, each entity takes the next
/// [`RowSchema::width`] values of the row.
pub trait RowTuple: 'static {
    type Output: Send + 'static;

    fn schemas() -> Vec<&'static RowSchema>;

    fn materialize(values: &[Value], quote: &str) -> Result<Self::Output>;
}

macro_rules! impl_row_tuple {
    ($($t:ident),+) => {
        impl<$($t: RowContract),+> RowTuple for ($($t,)+) {
            type Output = ($(RowProxy<$t>,)+);

            fn schemas() -> Vec<&'static RowSchema> {
                vec![$($t::schema()),+]
            }

            #[allow(unused_assignments)]
            fn materialize(values: &[Value], quote: &str) -> Result<Self::Output> {
                let mut offset = 0;
                Ok(($({
                    let values = values.get(offset..).unwrap_or_default();
                    let proxy = RowProxy::<$t>::materialize(values, quote)?;
                    offset += $t::schema().width();
                    proxy
                },)+))
            }
        }
    };
}
impl_row_tuple!(A);
impl_row_tuple!(A, B);
impl_row_tuple!(A, B, C);
impl_row_tuple!(A, B, C, D);
