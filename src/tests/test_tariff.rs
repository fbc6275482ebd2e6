use crate::core::energy_supply::energy_supply::EnergySupplyError;
use crate::core::energy_supply::tariff::{Tariff, TariffData};
use pretty_assertions::assert_eq;
use rstest::*;

#[fixture]
fn tariff_data() -> TariffData {
    TariffData::new("price\n0.10\n0.12\n0.31\n".as_bytes()).unwrap()
}

#[rstest]
fn test_reads_prices_in_order(tariff_data: TariffData) {
    assert_eq!(tariff_data, TariffData::from_prices(vec![0.10, 0.12, 0.31]));
    assert_eq!(tariff_data.price(2), Ok(0.31));
    assert_eq!(
        tariff_data.price(3),
        Err(EnergySupplyError::NoPriceForTimestep(3))
    );
}

#[rstest]
fn test_ignores_extra_columns() {
    let tariff_data = TariffData::new("hour,price\n0,0.2\n1,0.25\n".as_bytes()).unwrap();
    assert_eq!(tariff_data, TariffData::from_prices(vec![0.2, 0.25]));
}

#[rstest]
#[case("price\ncheap\n")]
#[case("cost\n0.1\n")]
fn test_rejects_malformed_tariff_file(#[case] csv: &str) {
    assert!(TariffData::new(csv.as_bytes()).is_err());
}

#[rstest]
fn test_coverage(tariff_data: TariffData) {
    assert_eq!(Tariff::Flat(0.13).timesteps_covered(), None);
    assert_eq!(Tariff::Flat(0.13).price(10_000), Ok(0.13));

    let tariff = Tariff::TimeOfUse(tariff_data);
    assert_eq!(tariff.timesteps_covered(), Some(3));
    assert_eq!(tariff.prices().collect::<Vec<_>>(), vec![0.10, 0.12, 0.31]);
}
