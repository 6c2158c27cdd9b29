use crate::error::CatalogError;

/// Year the first automobile was patented; production years below it are
/// rejected.
pub const MIN_PRODUCTION_YEAR: i32 = 1886;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 32;
const NUMBER_MIN: usize = 4;
const NUMBER_MAX: usize = 12;

/// Accumulates field-level violations and reports them all at once as a
/// single `Validation` error, `field - message;` per violation. Runs
/// before any store interaction.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<String>,
}

impl Violations {
    pub fn push(&mut self, field: &str, message: &str) {
        self.items.push(format!("{field} - {message};"));
    }

    pub fn into_result(self) -> Result<(), CatalogError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self.items.concat()))
        }
    }

    pub fn check_name(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.push(field, "should not be empty!");
        } else if !(NAME_MIN..=NAME_MAX).contains(&value.chars().count()) {
            self.push(field, "should be between 2 and 32 characters!");
        }
    }

    pub fn check_number(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.push(field, "should not be empty!");
        } else if !(NUMBER_MIN..=NUMBER_MAX).contains(&value.chars().count()) {
            self.push(field, "should be between 4 and 12 characters!");
        }
    }

    pub fn check_year(&mut self, field: &str, year: i32) {
        if year < MIN_PRODUCTION_YEAR {
            self.push(field, "should not be before 1886!");
        }
    }
}

pub fn validate_brand_name(name: &str) -> Result<(), CatalogError> {
    let mut violations = Violations::default();
    violations.check_name("brandName", name);
    violations.into_result()
}

pub fn validate_category_name(name: &str) -> Result<(), CatalogError> {
    let mut violations = Violations::default();
    violations.check_name("categoryName", name);
    violations.into_result()
}

pub fn validate_model_fields(brand: &str, name: &str, production_year: i32) -> Result<(), CatalogError> {
    let mut violations = Violations::default();
    violations.check_name("brandName", brand);
    violations.check_name("modelName", name);
    violations.check_year("productionYear", production_year);
    violations.into_result()
}

pub fn validate_car_number(number: &str) -> Result<(), CatalogError> {
    let mut violations = Violations::default();
    violations.check_number("number", number);
    violations.into_result()
}

pub fn validate_car_fields(
    number: &str,
    brand: &str,
    model: &str,
    production_year: i32,
) -> Result<(), CatalogError> {
    let mut violations = Violations::default();
    violations.check_number("number", number);
    violations.check_name("brandName", brand);
    violations.check_name("modelName", model);
    violations.check_year("productionYear", production_year);
    violations.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_bounds() {
        assert!(validate_brand_name("BM").is_ok());
        assert!(validate_brand_name(&"a".repeat(32)).is_ok());

        assert!(validate_brand_name("").is_err());
        assert!(validate_brand_name("A").is_err());
        assert!(validate_brand_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn number_bounds() {
        assert!(validate_car_number("AA11").is_ok());
        assert!(validate_car_number(&"7".repeat(12)).is_ok());

        assert!(validate_car_number("").is_err());
        assert!(validate_car_number("A12").is_err());
        assert!(validate_car_number(&"7".repeat(13)).is_err());
    }

    #[test]
    fn year_floor() {
        assert!(validate_model_fields("Benz", "Motorwagen", 1886).is_ok());
        let err = validate_model_fields("Benz", "Motorwagen", 1885).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn violations_are_aggregated() {
        let err = validate_car_fields("", "B", "Corolla", 1700).unwrap_err();
        let CatalogError::Validation(message) = err else {
            panic!("expected a validation error");
        };
        assert!(message.contains("number - should not be empty!;"));
        assert!(message.contains("brandName - should be between 2 and 32 characters!;"));
        assert!(message.contains("productionYear - should not be before 1886!;"));
        assert!(!message.contains("modelName"));
    }
}
