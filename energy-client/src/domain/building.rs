use serde::{Deserialize, Serialize};

use super::{Metric, Metrics, Period, Value};

/// Identity and categorical attributes of a building. Together they form
/// the grouping key used when materializing Total/Mean rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub property_id: i64,
    pub property_name: String,
    pub bbl: i64,
    pub address: String,
    pub city: String,
    pub postcode: String,
    pub property_type: String,
    pub borough: String,
    pub council_district: i64,
    pub census_tract: String,
    pub is_lowrise: String,
    pub latitude: f64,
    pub longitude: f64,
    pub year_built: i64,
    pub community_board: String,
    pub nta: String,
}

/// Hashable form of [`Building`]; coordinates compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildingKey {
    ids: [i64; 4],
    coords: [u64; 2],
    text: [String; 10],
}

impl Building {
    pub fn key(&self) -> BuildingKey {
        BuildingKey {
            ids: [self.property_id, self.bbl, self.council_district, self.year_built],
            coords: [self.latitude.to_bits(), self.longitude.to_bits()],
            text: [
                self.property_name.clone(),
                self.address.clone(),
                self.city.clone(),
                self.postcode.clone(),
                self.property_type.clone(),
                self.borough.clone(),
                self.census_tract.clone(),
                self.is_lowrise.clone(),
                self.community_board.clone(),
                self.nta.clone(),
            ],
        }
    }

    pub fn attribute(&self, attr: Attribute) -> Value {
        match attr {
            Attribute::PropertyId => Value::Number(self.property_id as f64),
            Attribute::PropertyName => Value::Text(self.property_name.clone()),
            Attribute::Bbl => Value::Number(self.bbl as f64),
            Attribute::Address => Value::Text(self.address.clone()),
            Attribute::City => Value::Text(self.city.clone()),
            Attribute::Postcode => Value::Text(self.postcode.clone()),
            Attribute::PropertyType => Value::Text(self.property_type.clone()),
            Attribute::Borough => Value::Text(self.borough.clone()),
            Attribute::CouncilDistrict => Value::Number(self.council_district as f64),
            Attribute::CensusTract => Value::Text(self.census_tract.clone()),
            Attribute::IsLowrise => Value::Text(self.is_lowrise.clone()),
            Attribute::Latitude => Value::Number(self.latitude),
            Attribute::Longitude => Value::Number(self.longitude),
            Attribute::YearBuilt => Value::Number(self.year_built as f64),
            Attribute::CommunityBoard => Value::Text(self.community_board.clone()),
            Attribute::Nta => Value::Text(self.nta.clone()),
        }
    }
}

/// Identity/categorical columns, in source-file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    PropertyId,
    PropertyName,
    Bbl,
    Address,
    City,
    Postcode,
    PropertyType,
    Borough,
    CouncilDistrict,
    CensusTract,
    IsLowrise,
    Latitude,
    Longitude,
    YearBuilt,
    CommunityBoard,
    Nta,
}

impl Attribute {
    pub const ALL: [Attribute; 16] = [
        Attribute::PropertyId,
        Attribute::PropertyName,
        Attribute::Bbl,
        Attribute::Address,
        Attribute::City,
        Attribute::Postcode,
        Attribute::PropertyType,
        Attribute::Borough,
        Attribute::CouncilDistrict,
        Attribute::CensusTract,
        Attribute::IsLowrise,
        Attribute::Latitude,
        Attribute::Longitude,
        Attribute::YearBuilt,
        Attribute::CommunityBoard,
        Attribute::Nta,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Attribute::PropertyId => "Property Id",
            Attribute::PropertyName => "Property Name",
            Attribute::Bbl => "bbl",
            Attribute::Address => "Address 1",
            Attribute::City => "City",
            Attribute::Postcode => "Postcode",
            Attribute::PropertyType => "Primary Property Type - Self Selected",
            Attribute::Borough => "Borough",
            Attribute::CouncilDistrict => "Council District",
            Attribute::CensusTract => "Census Tract",
            Attribute::IsLowrise => "isLowrise",
            Attribute::Latitude => "Latitude",
            Attribute::Longitude => "Longitude",
            Attribute::YearBuilt => "Year Built",
            Attribute::CommunityBoard => "Community Board",
            Attribute::Nta => "NTA",
        }
    }
}

/// The five grouping dimensions offered by the dashboard dropdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Borough")]
    Borough,
    #[serde(rename = "Council District")]
    CouncilDistrict,
    #[serde(rename = "Community Board")]
    CommunityBoard,
    #[serde(rename = "NTA")]
    Nta,
    #[serde(rename = "isLowrise")]
    IsLowrise,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::CouncilDistrict,
        Category::IsLowrise,
        Category::CommunityBoard,
        Category::Nta,
        Category::Borough,
    ];

    pub fn attribute(&self) -> Attribute {
        match self {
            Category::Borough => Attribute::Borough,
            Category::CouncilDistrict => Attribute::CouncilDistrict,
            Category::CommunityBoard => Attribute::CommunityBoard,
            Category::Nta => Attribute::Nta,
            Category::IsLowrise => Attribute::IsLowrise,
        }
    }

    pub fn name(&self) -> &'static str {
        self.attribute().column()
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Any addressable column of the unified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Attribute(Attribute),
    YearEnding,
    Metric(Metric),
}

pub const YEAR_ENDING: &str = "Year Ending";

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Attribute(a) => a.column(),
            Column::YearEnding => YEAR_ENDING,
            Column::Metric(m) => m.column(),
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        if name == YEAR_ENDING {
            return Some(Column::YearEnding);
        }
        Attribute::ALL
            .iter()
            .find(|a| a.column() == name)
            .map(|a| Column::Attribute(*a))
            .or_else(|| Metric::from_column(name).map(Column::Metric))
    }
}

impl From<Attribute> for Column {
    fn from(a: Attribute) -> Self {
        Column::Attribute(a)
    }
}

impl From<Metric> for Column {
    fn from(m: Metric) -> Self {
        Column::Metric(m)
    }
}

impl From<Category> for Column {
    fn from(c: Category) -> Self {
        Column::Attribute(c.attribute())
    }
}

/// One row of the unified table: a building in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub building: Building,
    pub period: Period,
    pub metrics: Metrics,
}

impl Record {
    pub fn value(&self, column: Column) -> Value {
        match column {
            Column::Attribute(a) => self.building.attribute(a),
            Column::YearEnding => Value::Number(self.period.tag() as f64),
            Column::Metric(m) => Value::Number(self.metrics[m]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_covers_every_name() {
        for a in Attribute::ALL {
            assert_eq!(Column::from_name(a.column()), Some(Column::Attribute(a)));
        }
        assert_eq!(Column::from_name("Year Ending"), Some(Column::YearEnding));
        assert_eq!(
            Column::from_name("ENERGY STAR Score"),
            Some(Column::Metric(Metric::EnergyStarScore))
        );
        assert_eq!(Column::from_name("Floor Area"), None);
    }

    #[test]
    fn category_names_match_dropdown_labels() {
        assert_eq!(Category::from_name("Council District"), Some(Category::CouncilDistrict));
        assert_eq!(Category::from_name("isLowrise"), Some(Category::IsLowrise));
        let parsed: Category = serde_json::from_str(r#""NTA""#).unwrap();
        assert_eq!(parsed, Category::Nta);
    }
}
