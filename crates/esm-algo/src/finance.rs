//! Discounting, annuities, and salvage value.
//!
//! All factors are divisors or multipliers on parameters; nothing here
//! touches variables.

use crate::schema::DepreciationMethod;
use esm_core::{Axis, EsmError, EsmResult, Mask, Param};

fn horizon(years: &Axis) -> EsmResult<(f64, f64)> {
    let values = years.numeric_values()?;
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(EsmError::MissingDimension(format!("{} (empty)", years.name()))),
    }
}

/// `(1 + rate) ^ (Y - Y0 + offset)` for every year of `years`.
///
/// Offset 0 discounts to the start of the year, 0.5 to mid-year.
pub fn discount_factor(rate: &Param, years: &Axis, offset: f64) -> EsmResult<Param> {
    let (y0, _) = horizon(years)?;
    let exponent = Param::coordinate_values(years)?.add_scalar(offset - y0);
    rate.add_scalar(1.0).powf(&exponent)
}

/// `(1 + rate) ^ (1 + Yn - Y0)`: brings end-of-horizon salvage to the start.
pub fn salvage_discount(rate: &Param, years: &Axis) -> EsmResult<Param> {
    let (y0, yn) = horizon(years)?;
    Ok(rate.map(|r| (1.0 + r).powf(1.0 + yn - y0)))
}

/// Present-value annuity and capital recovery factor.
///
/// A zero rate takes the limits `L` and `1 / L`.
pub fn annuity(rate: &Param, life: &Param) -> EsmResult<(Param, Param)> {
    let pva = rate.zip_with(life, |r, l| {
        Some(if *r == 0.0 {
            *l
        } else {
            (1.0 - (1.0 + r).powf(-l)) * (1.0 + r) / r
        })
    })?;
    let crf = rate.zip_with(life, |r, l| {
        if *r == 0.0 {
            return (*l != 0.0).then(|| 1.0 / l);
        }
        let denominator = 1.0 - (1.0 + r).powf(-l);
        (denominator != 0.0).then(|| (1.0 - (1.0 + r).powf(-1.0)) / denominator)
    })?;
    Ok((pva.named("PvAnnuity"), crf.named("CapitalRecoveryFactor")))
}

/// Which salvage formula applies where, and the resulting factor.
///
/// The three masks share one domain (entity × YEAR, wherever rate, life
/// and method are all known) and exactly one is true at each index.
#[derive(Debug, Clone)]
pub struct SalvagePartition {
    pub sinking_fund: Mask,
    pub straight_line: Mask,
    pub none: Mask,
    /// Fraction of the capital cost recovered at the end of the horizon.
    pub factor: Param,
}

/// Salvage partition for capacity built in each year.
///
/// `method` is the regional depreciation method; `rate` and `life` are per
/// entity.
pub fn salvage(
    rate: &Param,
    life: &Param,
    method: &Param,
    years: &Axis,
) -> EsmResult<SalvagePartition> {
    let (_, yn) = horizon(years)?;
    let year_values = Param::coordinate_values(years)?;

    let last_operating_year = life.add(&year_values)?.add_scalar(-1.0);
    let outlives = last_operating_year.gt_scalar(yn);
    let scope = last_operating_year
        .present()
        .and(&rate.present())?
        .and(&method.present())?;

    let sinking = method.eq_scalar(DepreciationMethod::SinkingFund.code());
    let straight = method.eq_scalar(DepreciationMethod::StraightLine.code());

    let sinking_fund = scope
        .and(&sinking)?
        .and(&outlives)?
        .and(&rate.gt_scalar(0.0))?
        .named("SalvageSinkingFund");
    let straight_line = scope
        .and(&outlives)?
        .and(&rate.eq_scalar(0.0).or(&straight)?)?
        .named("SalvageStraightLine");
    let none = scope.and(&outlives.not())?.named("SalvageNone");

    let remaining = year_values.map(|y| yn - y + 1.0);
    let growth = rate.add_scalar(1.0);
    let decayed = growth
        .powf(&remaining)?
        .add_scalar(-1.0)
        .div(&growth.powf(life)?.add_scalar(-1.0))?;
    let sinking_factor = decayed.scale(-1.0).add_scalar(1.0);
    let straight_factor = remaining.div(life)?.scale(-1.0).add_scalar(1.0);

    let factor = none
        .filter_map(|m| m.then_some(0.0))
        .or_else(&sinking_factor.where_mask(&sinking_fund)?)?
        .or_else(&straight_factor.where_mask(&straight_line)?)?
        .named("SalvageFactor");

    Ok(SalvagePartition {
        sinking_fund,
        straight_line,
        none,
        factor,
    })
}

/// Entity-specific rate where given, otherwise the regional rate broadcast
/// over the entity axes.
pub fn entity_rate(specific: &Param, regional: &Param, entity_axes: &[&Axis]) -> EsmResult<Param> {
    let mut broadcast = regional.clone();
    for axis in entity_axes {
        broadcast = broadcast.expand(axis)?;
    }
    Ok(specific.or_else(&broadcast)?.named(specific.label().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use esm_core::Coord;

    fn axis(name: &str, coords: &[&str]) -> Axis {
        Axis::new(name, coords.iter().map(|c| Coord::from(*c)).collect()).unwrap()
    }

    fn years() -> Axis {
        Axis::new("YEAR", (2020..2025).map(Coord::Int).collect()).unwrap()
    }

    fn per_region(label: &str, values: &[(&str, f64)]) -> Param {
        Param::from_entries(
            label,
            vec![axis("REGION", &["R1", "R2", "R3"])],
            values.iter().map(|(r, v)| (vec![Coord::from(*r)], *v)),
        )
        .unwrap()
    }

    #[test]
    fn test_discount_factor_first_year_is_one_and_grows() {
        let rate = per_region("DiscountRate", &[("R1", 0.05), ("R2", 0.0)]);
        let df = discount_factor(&rate, &years(), 0.0).unwrap();
        assert_eq!(df.get(&["R1".into(), 2020.into()]), Some(&1.0));
        let mut previous = 0.0;
        for y in 2020..2025 {
            let v = *df.get(&["R1".into(), y.into()]).unwrap();
            assert!(v >= previous);
            previous = v;
            assert_eq!(df.get(&["R2".into(), y.into()]), Some(&1.0));
        }
        assert!(df.get(&["R3".into(), 2020.into()]).is_none());
    }

    #[test]
    fn test_mid_year_offset() {
        let rate = per_region("DiscountRate", &[("R1", 0.1)]);
        let df = discount_factor(&rate, &years(), 0.5).unwrap();
        let v = *df.get(&["R1".into(), 2020.into()]).unwrap();
        assert!((v - 1.1f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_salvage_discount_spans_horizon() {
        let rate = per_region("DiscountRate", &[("R1", 0.1)]);
        let d = salvage_discount(&rate, &years()).unwrap();
        assert!((d.get(&["R1".into()]).unwrap() - 1.1f64.powi(5)).abs() < 1e-12);
    }

    #[test]
    fn test_annuity_times_recovery_is_one() {
        let rate = per_region("r", &[("R1", 0.07), ("R2", 0.0)]);
        let life = per_region("l", &[("R1", 20.0), ("R2", 4.0)]);
        let (pva, crf) = annuity(&rate, &life).unwrap();
        let product = pva.mul(&crf).unwrap();
        for v in product.values() {
            assert!((v - 1.0).abs() < 1e-12);
        }
        assert_eq!(pva.get(&["R2".into()]), Some(&4.0));
        assert_eq!(crf.get(&["R2".into()]), Some(&0.25));
    }

    #[test]
    fn test_salvage_masks_partition_domain() {
        let rate = per_region("r", &[("R1", 0.05), ("R2", 0.0), ("R3", 0.05)]);
        let life = per_region("l", &[("R1", 3.0), ("R2", 3.0), ("R3", 3.0)]);
        let method = per_region("m", &[("R1", 1.0), ("R2", 1.0), ("R3", 2.0)]);
        let part = salvage(&rate, &life, &method, &years()).unwrap();

        assert_eq!(part.none.len(), 15);
        for (key, none) in part.none.iter() {
            let coords = part.none.coords_of(key);
            let count = [&part.sinking_fund, &part.straight_line]
                .iter()
                .filter(|m| m.get(&coords) == Some(&true))
                .count()
                + usize::from(*none);
            assert_eq!(count, 1, "at {:?}", coords);
            assert!(part.factor.get(&coords).is_some());
        }

        // built 2022 with life 3 ends exactly at the horizon
        assert_eq!(part.factor.get(&["R1".into(), 2022.into()]), Some(&0.0));
        // straight line: 2024 build, one year used of three
        let v = *part.factor.get(&["R3".into(), 2024.into()]).unwrap();
        assert!((v - 2.0 / 3.0).abs() < 1e-12);
        // zero rate with sinking fund falls back to straight line
        assert_eq!(part.straight_line.get(&["R2".into(), 2023.into()]), Some(&true));
        let v = *part.factor.get(&["R2".into(), 2023.into()]).unwrap();
        assert!((v - 1.0 / 3.0).abs() < 1e-12);
        // sinking fund: 1 - ((1.05)^1 - 1) / ((1.05)^3 - 1)
        let v = *part.factor.get(&["R1".into(), 2024.into()]).unwrap();
        let expected = 1.0 - 0.05 / (1.05f64.powi(3) - 1.0);
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn test_entity_rate_falls_back_to_region() {
        let techs = axis("TECHNOLOGY", &["A", "B"]);
        let regional = per_region("DiscountRate", &[("R1", 0.05)]);
        let specific = Param::from_entries(
            "DiscountRateIdv",
            vec![axis("REGION", &["R1", "R2", "R3"]), techs.clone()],
            [(vec!["R1".into(), "A".into()], 0.1)],
        )
        .unwrap();
        let rate = entity_rate(&specific, &regional, &[&techs]).unwrap();
        assert_eq!(rate.get(&["R1".into(), "A".into()]), Some(&0.1));
        assert_eq!(rate.get(&["R1".into(), "B".into()]), Some(&0.05));
        assert!(rate.get(&["R2".into(), "B".into()]).is_none());
    }
}
