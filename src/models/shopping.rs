use sea_orm::FromQueryResult;

/// One aggregated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingTotalRow {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// How much of an ingredient a single cart recipe asks for.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingContributionRow {
    pub name: String,
    pub measurement_unit: String,
    pub recipe_name: String,
    pub amount: i32,
}
