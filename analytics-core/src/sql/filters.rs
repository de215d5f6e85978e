use itertools::join;

use super::Conjunction;
use crate::dialect::Dialect;
use crate::query::QueryParams;

/// One group per filter dimension, in the order the filters were given:
/// the dimensional objects of a dimension are or'ed, the groups are and'ed.
///
/// `( ax."ou" in ('a','b') or ax."uidlevel2" in ('c') )`
pub fn append_filters<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    sql: &mut String,
    conj: &mut Conjunction,
    )
{
    for (_dimension, filters) in params.dimension_filter_map() {
        let predicates: Vec<_> = filters.iter()
            .filter(|f| f.has_items())
            .map(|f| {
                format!("{} in ({})",
                    dialect.quote_alias(f.column_name()),
                    dialect.literal_list(&f.item_ids()),
                )
            })
            .collect();

        if predicates.is_empty() {
            continue;
        }

        sql.push_str(conj.next());
        sql.push_str(&format!("( {} )", join(predicates, " or ")));
    }
}
