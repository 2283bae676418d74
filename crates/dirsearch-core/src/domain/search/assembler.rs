//! Statement assembly for the four search variants
//!
//! Every statement starts from a realm-scoped base, ANDs one `IN (...)`
//! filter per compiled predicate and optionally appends ordering and paging.

use super::binder::bind_terms;
use super::entity::{OrderDirection, Page};
use super::predicate::{REALM_PARAM, compile, render_filters};
use super::sql::{Bindings, BoundStatement, SqlWriter};
use super::term::{FieldCategory, SearchTermMap, classify, fold_case};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Placeholder for the index label when it names an attribute
pub const LABEL_PARAM: &str = "label";
/// Placeholder for the index value pattern
pub const VALUE_PARAM: &str = "value";
/// Placeholder for the attribute name an attribute-ordered list sorts by
pub const ORDER_NAME_PARAM: &str = "orderName";
const LIMIT_PARAM: &str = "limit";
const OFFSET_PARAM: &str = "offset";

const PRINCIPAL_COLUMNS: &str = "p.id, p.realm_id, p.username, p.email, p.first_name, \
                                 p.last_name, p.enabled, p.created_at";

/// Knobs that change statement shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Join only the order field's attribute rows when sorting by an attribute.
    ///
    /// When false every attribute row of a principal is joined, so a principal
    /// appears once per attribute it carries.
    pub restrict_attribute_sort: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            restrict_attribute_sort: true,
        }
    }
}

/// Builds bound statements for list, count, index and index count
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAssembler {
    options: SearchOptions,
}

impl QueryAssembler {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Paginated principal rows, each with the value it was sorted by.
    ///
    /// Group and attribute ordering joins the sorted rows, so one principal
    /// may appear several times. Paging applies to the joined rows.
    pub fn list(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        order_field: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<BoundStatement> {
        let mut bindings = base_bindings(realm_id, terms);
        let mut w = SqlWriter::new();
        let dir = direction.as_sql();

        let order_by = match classify(order_field) {
            FieldCategory::Default(field) => {
                let column = format!("p.{}", field.column());
                w.push(&format!(
                    "SELECT {}, {} AS sort_key FROM principals p",
                    PRINCIPAL_COLUMNS, column
                ));
                format!("{} {}, p.id", column, dir)
            }
            FieldCategory::Group => {
                w.push(&format!(
                    "SELECT {}, pg.name_lower AS sort_key FROM principals p \
                     LEFT JOIN (SELECT gm.principal_id, g.name_lower FROM group_memberships gm \
                     JOIN principal_groups g ON g.id = gm.group_id WHERE g.realm_id = ",
                    PRINCIPAL_COLUMNS
                ))
                .placeholder(REALM_PARAM)
                .push(") pg ON pg.principal_id = p.id");
                format!("sort_key {}, p.id", dir)
            }
            FieldCategory::Attribute(name) => {
                w.push(&format!(
                    "SELECT {}, a.value_lower AS sort_key FROM principals p \
                     LEFT JOIN principal_attributes a ON a.principal_id = p.id",
                    PRINCIPAL_COLUMNS
                ));
                if self.options.restrict_attribute_sort {
                    w.push(" AND a.name = ").placeholder(ORDER_NAME_PARAM);
                    bindings.text(ORDER_NAME_PARAM, name);
                }
                format!("sort_key {}, p.id", dir)
            }
        };

        w.push(" WHERE p.realm_id = ").placeholder(REALM_PARAM);
        render_filters(&mut w, &compile(terms), "p.id");
        w.push(&format!(" ORDER BY {}", order_by));
        render_page(&mut w, &mut bindings, page);

        w.finish().bind(&bindings)
    }

    /// Number of distinct principals matching the filters
    pub fn count(&self, realm_id: &str, terms: &SearchTermMap) -> Result<BoundStatement> {
        let bindings = base_bindings(realm_id, terms);
        let mut w = SqlWriter::new();

        w.push("SELECT COUNT(DISTINCT p.id) FROM principals p WHERE p.realm_id = ")
            .placeholder(REALM_PARAM);
        render_filters(&mut w, &compile(terms), "p.id");

        w.finish().bind(&bindings)
    }

    /// Distinct values of `label` among matching principals, ordered
    /// case-insensitively
    pub fn index(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<BoundStatement> {
        let mut bindings = base_bindings(realm_id, terms);
        let mut w = SqlWriter::new();

        let source = IndexSource::for_label(label);
        w.push(&format!("SELECT {} AS index_value", source.column));
        source.render_body(&mut w, &mut bindings, terms, value_pattern);
        w.push(&format!(
            " GROUP BY {col} ORDER BY {folded} {dir}, {col}",
            col = source.column,
            folded = source.folded,
            dir = direction.as_sql()
        ));
        render_page(&mut w, &mut bindings, page);

        w.finish().bind(&bindings)
    }

    /// Number of distinct values `index` would return without paging
    pub fn index_count(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
    ) -> Result<BoundStatement> {
        let mut bindings = base_bindings(realm_id, terms);
        let mut w = SqlWriter::new();

        let source = IndexSource::for_label(label);
        w.push(&format!("SELECT COUNT(DISTINCT {})", source.column));
        source.render_body(&mut w, &mut bindings, terms, value_pattern);

        w.finish().bind(&bindings)
    }
}

/// Where the values of an indexed label live
struct IndexSource {
    category: FieldCategory,
    column: String,
    folded: String,
}

impl IndexSource {
    fn for_label(label: &str) -> Self {
        let category = classify(label);
        let (column, folded) = match &category {
            FieldCategory::Default(field) => (
                format!("p.{}", field.column()),
                format!("p.{}", field.folded_column()),
            ),
            FieldCategory::Group => ("g.name".to_string(), "g.name_lower".to_string()),
            FieldCategory::Attribute(_) => ("a.value".to_string(), "a.value_lower".to_string()),
        };
        Self {
            category,
            column,
            folded,
        }
    }

    /// FROM and WHERE clauses shared by `index` and `index_count`
    fn render_body(
        &self,
        w: &mut SqlWriter,
        bindings: &mut Bindings,
        terms: &SearchTermMap,
        value_pattern: &str,
    ) {
        let id_column = match &self.category {
            FieldCategory::Default(_) => {
                w.push(" FROM principals p WHERE p.realm_id = ")
                    .placeholder(REALM_PARAM);
                "p.id"
            }
            FieldCategory::Group => {
                w.push(
                    " FROM principal_groups g \
                     JOIN group_memberships gm ON gm.group_id = g.id \
                     WHERE g.realm_id = ",
                )
                .placeholder(REALM_PARAM);
                "gm.principal_id"
            }
            FieldCategory::Attribute(name) => {
                w.push(
                    " FROM principal_attributes a \
                     JOIN principals p ON p.id = a.principal_id \
                     WHERE p.realm_id = ",
                )
                .placeholder(REALM_PARAM)
                .push(" AND a.name = ")
                .placeholder(LABEL_PARAM);
                bindings.text(LABEL_PARAM, name.as_str());
                "p.id"
            }
        };

        w.push(&format!(" AND {} LIKE ", self.folded))
            .placeholder(VALUE_PARAM);
        bindings.text(VALUE_PARAM, fold_case(value_pattern));

        render_filters(w, &compile(terms), id_column);
    }
}

fn base_bindings(realm_id: &str, terms: &SearchTermMap) -> Bindings {
    let mut bindings = bind_terms(terms);
    bindings.text(REALM_PARAM, realm_id);
    bindings
}

/// `LIMIT`/`OFFSET` for a page; SQLite needs a limit before an offset, and
/// `-1` there means no limit
fn render_page(w: &mut SqlWriter, bindings: &mut Bindings, page: Page) {
    match (page.limit, page.offset) {
        (None, None) => {}
        (Some(limit), None) => {
            w.push(" LIMIT ").placeholder(LIMIT_PARAM);
            bindings.integer(LIMIT_PARAM, i64::from(limit));
        }
        (limit, Some(offset)) => {
            w.push(" LIMIT ")
                .placeholder(LIMIT_PARAM)
                .push(" OFFSET ")
                .placeholder(OFFSET_PARAM);
            bindings
                .integer(LIMIT_PARAM, limit.map_or(-1, i64::from))
                .integer(OFFSET_PARAM, i64::from(offset));
        }
    }
}
