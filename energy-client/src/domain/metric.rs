use std::ops::{Index, IndexMut};

/// Which family a metric column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    UsageIntensity,
    UsageTotal,
    EmissionIntensity,
    EmissionTotal,
    Rating,
}

macro_rules! metrics {
    ($($variant:ident => $column:expr, $label:literal, $kind:ident;)+) => {
        /// Numeric metric columns of the benchmarking dataset.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Metric {
            $($variant,)+
        }

        impl Metric {
            pub const ALL: [Metric; METRIC_COUNT] = [$(Metric::$variant,)+];

            /// Column header as it appears in the source file and in output rows.
            pub fn column(&self) -> &'static str {
                match self {
                    $(Metric::$variant => $column,)+
                }
            }

            /// Short source-type label used by breakdown charts.
            pub fn label(&self) -> &'static str {
                match self {
                    $(Metric::$variant => $label,)+
                }
            }

            pub fn kind(&self) -> MetricKind {
                match self {
                    $(Metric::$variant => MetricKind::$kind,)+
                }
            }
        }
    };
}

pub const METRIC_COUNT: usize = 27;

metrics! {
    SourceEui => "Source EUI (kBtu/ft²)", "Source Energy", UsageIntensity;
    SiteEui => "Site EUI (kBtu/ft²)", "Site Energy", UsageIntensity;
    FuelOilIntensity => "Fuel Oil Use Total Intensity (kBtu/ft2)", "Fuel Oil", UsageIntensity;
    NaturalGasIntensity => "Natural Gas Use Intensity (kBtu/ft2)", "Natural Gas", UsageIntensity;
    DieselIntensity => "Diesel #2 Use Intensity (kBtu/ft2)", "Diesel #2", UsageIntensity;
    ChilledWaterIntensity =>
        "District Chilled Water Use Intensity (kBtu/ft2)", "Chilled Water", UsageIntensity;
    SteamIntensity => "District Steam Use Intensity (kBtu/ft2)", "District Steam", UsageIntensity;
    GreenPowerIntensity =>
        "Green Power - Onsite and Offsite Intensity (kBtu/ft2)", "Green Power", UsageIntensity;
    ElectricityIntensity =>
        concat!(
            "Electricity Use - Grid Purchase and Generated from Onsite",
            " Renewable Systems Intensity (kBtu/ft2)"
        ),
        "Electricity",
        UsageIntensity;
    SourceEnergyUse => "Source Energy Use (kBtu)", "Source Energy", UsageTotal;
    SiteEnergyUse => "Site Energy Use (kBtu)", "Site Energy", UsageTotal;
    FuelOilUse => "Fuel Oil Use Total (kBtu)", "Fuel Oil", UsageTotal;
    NaturalGasUse => "Natural Gas Use (kBtu)", "Natural Gas", UsageTotal;
    DieselUse => "Diesel #2 Use (kBtu)", "Diesel #2", UsageTotal;
    ChilledWaterUse => "District Chilled Water Use (kBtu)", "Chilled Water", UsageTotal;
    SteamUse => "District Steam Use (kBtu)", "District Steam", UsageTotal;
    GreenPowerUse => "Green Power - Onsite and Offsite (kBtu)", "Green Power", UsageTotal;
    ElectricityUse =>
        "Electricity Use - Grid Purchase and Generated from Onsite Renewable Systems (kBtu)",
        "Electricity",
        UsageTotal;
    TotalGhgIntensity =>
        "Total GHG Emissions Intensity (kgCO2e/ft²)", "Total GHG Emissions", EmissionIntensity;
    IndirectGhgIntensity =>
        "Indirect GHG Emissions Intensity (kgCO2e/ft²)",
        "Indirect GHG Emissions",
        EmissionIntensity;
    DirectGhgIntensity =>
        "Direct GHG Emissions Intensity (kgCO2e/ft²)", "Direct GHG Emissions", EmissionIntensity;
    AvoidedEmissionsIntensity =>
        "Avoided Emissions - Onsite and Offsite Green Power Intensity (Metric Tons CO2e/ft2)",
        "Avoided Emissions",
        EmissionIntensity;
    TotalGhg => "Total GHG Emissions (Metric Tons CO2e)", "Total GHG Emissions", EmissionTotal;
    IndirectGhg =>
        "Indirect GHG Emissions (Metric Tons CO2e)", "Indirect GHG Emissions", EmissionTotal;
    DirectGhg => "Direct GHG Emissions (Metric Tons CO2e)", "Direct GHG Emissions", EmissionTotal;
    AvoidedEmissions =>
        "Avoided Emissions - Onsite and Offsite Green Power (Metric Tons CO2e)",
        "Avoided Emissions",
        EmissionTotal;
    EnergyStarScore => "ENERGY STAR Score", "ENERGY STAR Score", Rating;
}

impl Metric {
    pub fn from_column(name: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.column() == name)
    }

    pub fn of_kind(kind: MetricKind) -> impl Iterator<Item = Metric> {
        Metric::ALL.into_iter().filter(move |m| m.kind() == kind)
    }
}

/// One value per metric column; NaN marks a missing measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics([f64; METRIC_COUNT]);

impl Default for Metrics {
    fn default() -> Self {
        Self::missing()
    }
}

impl Metrics {
    pub fn missing() -> Self {
        Metrics([f64::NAN; METRIC_COUNT])
    }

    /// Per-column sum, skipping NaN. A column with nothing to add is 0.
    pub fn sum<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Metrics>,
    {
        let mut out = Metrics([0.0; METRIC_COUNT]);
        for row in rows {
            for (acc, v) in out.0.iter_mut().zip(row.0.iter()) {
                if !v.is_nan() {
                    *acc += v;
                }
            }
        }
        out
    }

    /// Per-column arithmetic mean, skipping NaN. A column with no values is NaN.
    pub fn mean<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Metrics>,
    {
        let mut sums = [0.0; METRIC_COUNT];
        let mut counts = [0usize; METRIC_COUNT];
        for row in rows {
            for (i, v) in row.0.iter().enumerate() {
                if !v.is_nan() {
                    sums[i] += v;
                    counts[i] += 1;
                }
            }
        }
        let mut out = Self::missing();
        for i in 0..METRIC_COUNT {
            if counts[i] > 0 {
                out.0[i] = sums[i] / counts[i] as f64;
            }
        }
        out
    }
}

impl Index<Metric> for Metrics {
    type Output = f64;

    fn index(&self, m: Metric) -> &f64 {
        &self.0[m as usize]
    }
}

impl IndexMut<Metric> for Metrics {
    fn index_mut(&mut self, m: Metric) -> &mut f64 {
        &mut self.0[m as usize]
    }
}
