//! 通路別消耗係數解析

use cplan_core::{Channel, Material, PlanError};
use rust_decimal::Decimal;

/// 消耗係數解析器
pub struct RateResolver;

impl RateResolver {
    /// 解析有效的 (消耗係數, 損耗率)
    ///
    /// 指定通路且物料有該通路覆寫時使用覆寫值，否則使用物料預設值。
    /// 係數與損耗率各自獨立查找。
    pub fn resolve(material: &Material, channel: Option<Channel>) -> cplan_core::Result<(Decimal, Decimal)> {
        let default_rate = material
            .consumption_rate
            .ok_or_else(|| PlanError::invalid_material(&material.code, "缺少消耗係數"))?;

        let rate = channel
            .and_then(|c| material.overrides.rate_for(c))
            .unwrap_or(default_rate);
        let scrap_rate = channel
            .and_then(|c| material.overrides.scrap_rate_for(c))
            .unwrap_or(material.scrap_rate);

        if rate < Decimal::ZERO {
            return Err(PlanError::invalid_material(&material.code, "消耗係數為負"));
        }
        if scrap_rate < Decimal::ZERO {
            return Err(PlanError::invalid_material(&material.code, "損耗率為負"));
        }

        Ok((rate, scrap_rate))
    }

    /// 解析係數，並以呼叫端指定的損耗率優先
    pub fn resolve_with_custom_scrap(
        material: &Material,
        channel: Option<Channel>,
        custom_scrap: Option<Decimal>,
    ) -> cplan_core::Result<(Decimal, Decimal)> {
        let (rate, scrap_rate) = Self::resolve(material, channel)?;
        Ok((rate, custom_scrap.unwrap_or(scrap_rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplan_core::{ChannelOverrides, MeasurementUnit, TriggerEvent};

    fn packing_tape() -> Material {
        Material::new(
            "SRF002",
            "Packing Tape 45mm",
            MeasurementUnit::Piece,
            TriggerEvent::ShipmentCount,
            Decimal::new(5, 1),
        )
        .with_scrap_rate(Decimal::new(5, 2))
        .with_overrides(
            ChannelOverrides::default()
                .with_rate(Channel::Online, Decimal::new(8, 1))
                .with_rate(Channel::Retail, Decimal::new(3, 1))
                .with_scrap_rate(Channel::Wholesale, Decimal::new(2, 2)),
        )
    }

    #[test]
    fn test_default_without_channel() {
        let (rate, scrap) = RateResolver::resolve(&packing_tape(), None).unwrap();
        assert_eq!(rate, Decimal::new(5, 1));
        assert_eq!(scrap, Decimal::new(5, 2));
    }

    #[test]
    fn test_channel_rate_override() {
        let (rate, scrap) = RateResolver::resolve(&packing_tape(), Some(Channel::Online)).unwrap();
        assert_eq!(rate, Decimal::new(8, 1));
        // 損耗率沒有 online 覆寫，使用預設值
        assert_eq!(scrap, Decimal::new(5, 2));
    }

    #[test]
    fn test_scrap_override_independent_of_rate() {
        let (rate, scrap) = RateResolver::resolve(&packing_tape(), Some(Channel::Wholesale)).unwrap();
        assert_eq!(rate, Decimal::new(5, 1));
        assert_eq!(scrap, Decimal::new(2, 2));
    }

    #[test]
    fn test_channel_without_override() {
        let (rate, scrap) = RateResolver::resolve(&packing_tape(), Some(Channel::Warehouse)).unwrap();
        assert_eq!(rate, Decimal::new(5, 1));
        assert_eq!(scrap, Decimal::new(5, 2));
    }

    #[test]
    fn test_missing_rate_is_invalid_material() {
        let mut material = packing_tape();
        material.consumption_rate = None;

        let err = RateResolver::resolve(&material, Some(Channel::Online)).unwrap_err();
        assert!(err.is_material_error());
    }

    #[test]
    fn test_custom_scrap_wins() {
        let (rate, scrap) =
            RateResolver::resolve_with_custom_scrap(&packing_tape(), Some(Channel::Wholesale), Some(Decimal::new(1, 1)))
                .unwrap();
        assert_eq!(rate, Decimal::new(5, 1));
        assert_eq!(scrap, Decimal::new(1, 1));
    }

    #[test]
    fn test_resolution_does_not_mutate_material() {
        let material = packing_tape();
        let before = material.clone();
        let _ = RateResolver::resolve(&material, Some(Channel::Online)).unwrap();
        assert_eq!(material, before);
    }
}
