use super::Conjunction;
use crate::dialect::Dialect;
use crate::query::QueryParams;

/// Restricts every column-backed query dimension to its selected items:
/// `ax."dx" in ('a','b')`. Dimensions without items select all rows and
/// emit nothing.
pub fn append_dimensions<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    sql: &mut String,
    conj: &mut Conjunction,
    )
{
    for dim in &params.dimensions {
        if dim.fixed || !dim.has_items() {
            continue;
        }

        sql.push_str(conj.next());
        sql.push_str(&format!("{} in ({})",
            dialect.quote_alias(dim.column_name()),
            dialect.literal_list(&dim.item_ids()),
        ));
    }
}
