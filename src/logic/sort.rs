use crate::error::CatalogError;

/// Raw sort parameters as they arrive from the caller. Resolution into a
/// typed clause happens per entity type and must run before any data is
/// fetched.
#[derive(Debug, Clone)]
pub struct SortCriteria {
    pub key: String,
    pub direction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// "DESC" in any casing sorts descending; every other value, including
    /// the empty string, falls back to ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("DESC") {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

/// A resolved ordering: a field drawn from the entity's closed vocabulary
/// plus a direction. There is no secondary tie-break; ties retain
/// store-defined order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortClause<F> {
    pub field: F,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandField {
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelField {
    BrandName,
    Name,
    ProductionYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarField {
    BrandName,
    Number,
    ModelName,
    ProductionYear,
}

impl SortCriteria {
    pub fn new(key: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: direction.into(),
        }
    }

    /// Brand listings always order by name; the key is not branched.
    pub fn for_brands(&self) -> SortClause<BrandField> {
        SortClause {
            field: BrandField::Name,
            direction: SortDirection::parse(&self.direction),
        }
    }

    /// Category listings always order by name; the key is not branched.
    pub fn for_categories(&self) -> SortClause<CategoryField> {
        SortClause {
            field: CategoryField::Name,
            direction: SortDirection::parse(&self.direction),
        }
    }

    pub fn for_models(&self) -> Result<SortClause<ModelField>, CatalogError> {
        let field = match self.key.as_str() {
            "brand" => ModelField::BrandName,
            "model" => ModelField::Name,
            "year" => ModelField::ProductionYear,
            _ => return Err(CatalogError::InvalidSortKey("Invalid sort key".to_string())),
        };
        Ok(SortClause {
            field,
            direction: SortDirection::parse(&self.direction),
        })
    }

    pub fn for_cars(&self) -> Result<SortClause<CarField>, CatalogError> {
        let field = match self.key.as_str() {
            "brand" => CarField::BrandName,
            "number" => CarField::Number,
            "model" => CarField::ModelName,
            "year" => CarField::ProductionYear,
            _ => return Err(CatalogError::InvalidSortKey("Invalid sort key".to_string())),
        };
        Ok(SortClause {
            field,
            direction: SortDirection::parse(&self.direction),
        })
    }
}
