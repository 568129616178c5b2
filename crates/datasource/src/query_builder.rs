//! Entry query builder using SeaQuery.
//!
//! Renders a [`FetchRequest`] into the paginated SELECT and the matching
//! COUNT for SQL-backed repositories. Entries live in `entries` (aliased
//! `e`); each field stores its values in `entries_data_<field id>`, joined
//! on `entry_id`.

use sea_query::{
    Alias, Asterisk, Condition, Expr, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};

use crate::config::SortOrder;
use crate::model::FieldId;
use crate::repository::{FetchRequest, SortTarget};

/// Alias of the entries table in every generated query.
pub const ENTRY_ALIAS: &str = "e";

/// Entries table name.
pub const ENTRY_TABLE: &str = "entries";

/// Creation timestamp column on the entries table.
pub const CREATION_DATE_COLUMN: &str = "creation_date_gmt";

/// Modification timestamp column on the entries table.
pub const MODIFICATION_DATE_COLUMN: &str = "modification_date_gmt";

/// Name of the data table backing a field.
pub fn data_table(field_id: FieldId) -> String {
    format!("entries_data_{field_id}")
}

/// Column reference `"<table>"."<column>"`.
pub fn column(table: &str, name: &str) -> Expr {
    Expr::col((Alias::new(table), Alias::new(name)))
}

/// Column reference on the entries table.
pub fn entry_column(name: &str) -> Expr {
    column(ENTRY_ALIAS, name)
}

/// Join specification contributed by a field's predicate builder.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Target table to join.
    pub table: String,
    /// Alias for the joined table.
    pub alias: String,
    /// ON condition expression.
    pub on_condition: SimpleExpr,
}

impl JoinSpec {
    /// LEFT JOIN a field's data table under `alias`, matched on the entry id.
    pub fn field_data(field_id: FieldId, alias: &str) -> Self {
        Self {
            table: data_table(field_id),
            alias: alias.to_string(),
            on_condition: entry_column("id").equals((Alias::new(alias), Alias::new("entry_id"))),
        }
    }
}

/// Rows to skip before `page` (1-based; anything lower is page 1).
/// Saturates instead of overflowing for absurd page numbers.
pub fn page_offset(page: i64, per_page: u64) -> u64 {
    let skipped = u64::try_from(page.saturating_sub(1)).unwrap_or(0);
    skipped.saturating_mul(per_page)
}

/// Query builder for paginated entry fetches.
pub struct EntryQueryBuilder<'a> {
    request: &'a FetchRequest,
}

impl<'a> EntryQueryBuilder<'a> {
    /// Create a builder for one fetch request.
    pub fn new(request: &'a FetchRequest) -> Self {
        Self { request }
    }

    /// Build the main SELECT query with pagination.
    pub fn build(&self) -> String {
        let mut query = Query::select();
        query.column((Alias::new(ENTRY_ALIAS), Asterisk));
        query.from_as(Alias::new(ENTRY_TABLE), Alias::new(ENTRY_ALIAS));

        self.add_joins(&mut query);
        self.add_filters(&mut query);

        if self.request.group {
            query.group_by_col((Alias::new(ENTRY_ALIAS), Alias::new("id")));
        }

        self.add_sort(&mut query);

        if let Some(per_page) = self.request.per_page {
            let per_page = u64::try_from(per_page).unwrap_or(0);
            query.limit(per_page);
            query.offset(page_offset(self.request.page, per_page));
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query for the total number of matching entries.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::cust("COUNT(DISTINCT \"e\".\"id\")"));
        query.from_as(Alias::new(ENTRY_TABLE), Alias::new(ENTRY_ALIAS));

        self.add_joins(&mut query);
        self.add_filters(&mut query);

        query.to_string(PostgresQueryBuilder)
    }

    fn add_joins(&self, query: &mut SelectStatement) {
        for join in &self.request.joins {
            query.join_as(
                sea_query::JoinType::LeftJoin,
                Alias::new(&join.table),
                Alias::new(&join.alias),
                join.on_condition.clone(),
            );
        }
    }

    fn add_filters(&self, query: &mut SelectStatement) {
        let condition: Condition = Condition::all()
            .add(entry_column("section_id").eq(self.request.section_id))
            .add(self.request.condition.clone());
        query.cond_where(condition);
    }

    fn add_sort(&self, query: &mut SelectStatement) {
        let order = match self.request.sort.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
            SortOrder::Random => {
                query.order_by_expr(Expr::cust("RANDOM()"), Order::Asc);
                return;
            }
        };

        match self.request.sort.target {
            SortTarget::SystemId => {
                query.order_by((Alias::new(ENTRY_ALIAS), Alias::new("id")), order);
            }
            SortTarget::CreationDate => {
                query.order_by(
                    (Alias::new(ENTRY_ALIAS), Alias::new(CREATION_DATE_COLUMN)),
                    order,
                );
            }
            SortTarget::ModificationDate => {
                query.order_by(
                    (Alias::new(ENTRY_ALIAS), Alias::new(MODIFICATION_DATE_COLUMN)),
                    order,
                );
            }
            SortTarget::Field(field_id) => {
                let join = JoinSpec::field_data(field_id, "ed");
                query.join_as(
                    sea_query::JoinType::LeftJoin,
                    Alias::new(&join.table),
                    Alias::new(&join.alias),
                    join.on_condition,
                );
                query.order_by((Alias::new("ed"), Alias::new("value")), order.clone());
                query.order_by((Alias::new(ENTRY_ALIAS), Alias::new("id")), order);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repository::SortSpec;

    fn request() -> FetchRequest {
        FetchRequest {
            page: 1,
            section_id: 7,
            per_page: Some(10),
            condition: Condition::all(),
            joins: Vec::new(),
            group: false,
            records_only: true,
            hydrate: true,
            element_names: Vec::new(),
            sort: SortSpec::default(),
        }
    }

    #[test]
    fn builds_paginated_select() {
        let mut req = request();
        req.page = 3;
        let sql = EntryQueryBuilder::new(&req).build();

        assert!(sql.starts_with("SELECT \"e\".* FROM \"entries\" AS \"e\""));
        assert!(sql.contains("\"e\".\"section_id\" = 7"));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let mut req = request();
        req.page = i64::MAX;
        let sql = EntryQueryBuilder::new(&req).build();

        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains(&format!("OFFSET {}", u64::MAX)));
    }

    #[test]
    fn page_offset_clamps_low_pages() {
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(-5, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(i64::MIN, 10), 0);
    }

    #[test]
    fn unlimited_page_size_has_no_limit() {
        let mut req = request();
        req.per_page = None;
        let sql = EntryQueryBuilder::new(&req).build();
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn field_joins_and_grouping() {
        let mut req = request();
        req.joins.push(JoinSpec::field_data(12, "t12"));
        req.group = true;
        let sql = EntryQueryBuilder::new(&req).build();

        assert!(sql.contains("LEFT JOIN \"entries_data_12\" AS \"t12\""));
        assert!(sql.contains("GROUP BY \"e\".\"id\""));
    }

    #[test]
    fn sort_by_creation_date() {
        let mut req = request();
        req.sort = SortSpec {
            target: SortTarget::CreationDate,
            order: SortOrder::Asc,
        };
        let sql = EntryQueryBuilder::new(&req).build();
        assert!(sql.contains("ORDER BY \"e\".\"creation_date_gmt\" ASC"));
    }

    #[test]
    fn sort_by_field_joins_its_data_table() {
        let mut req = request();
        req.sort = SortSpec {
            target: SortTarget::Field(4),
            order: SortOrder::Desc,
        };
        let sql = EntryQueryBuilder::new(&req).build();
        assert!(sql.contains("\"entries_data_4\" AS \"ed\""));
        assert!(sql.contains("ORDER BY \"ed\".\"value\" DESC"));
    }

    #[test]
    fn count_query_keeps_filters() {
        let mut req = request();
        req.condition = Condition::all().add(entry_column("id").is_in([1u64, 2]));
        let sql = EntryQueryBuilder::new(&req).build_count();
        assert!(sql.contains("COUNT(DISTINCT \"e\".\"id\")"));
        assert!(sql.contains("\"e\".\"id\" IN (1, 2)"));
        assert!(!sql.contains("LIMIT"));
    }
}
