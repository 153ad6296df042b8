//! Maps product titles to STAC collections and feature ids.
use crate::error::CollectionError;
use regex::RegexSet;
use serde::Serialize;
use std::sync::LazyLock;
use uuid::Uuid;

/// Namespace for feature ids; the catalogue expects exactly this one.
const FEATURE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x92, 0x70, 0x80, 0x59, 0x20, 0x77, 0x45, 0xa3, 0xa4, 0xf3, 0x1e, 0xb4, 0x28, 0x78, 0x9c, 0xff,
]);

// First match wins.
const PRODUCT_COLLECTIONS: &[(&str, &str)] = &[
    (r"^S1[A-DP]_.._GRD[HM]_.*", "sentinel-1-grd"),
    (r"^S1[A-DP]_.._SLC__.*", "sentinel-1-slc"),
    (r"^S1[A-DP]_.._RAW__.*", "sentinel-1-raw"),
    (r"^S1[A-DP]_.._OCN__.*", "sentinel-1-ocn"),
    (r"^S2[A-DP]_MSIL1B_.*", "sentinel-2-l1b"),
    (r"^S2[A-DP]_MSIL1C_.*", "sentinel-2-l1c"),
    (r"^S2[A-DP]_MSIL2A_.*", "sentinel-2-l2a"),
    (r"^S3[A-DP]_OL_1_.*", "sentinel-3-olci-l1b"),
    (r"^S3[A-DP]_OL_2_.*", "sentinel-3-olci-l2"),
    (r"^S3[A-DP]_SL_1_.*", "sentinel-3-slstr-l1b"),
    (r"^S3[A-DP]_SL_2_.*", "sentinel-3-slstr-l2"),
    (r"^S3[A-DP]_SR_1_.*", "sentinel-3-stm-l1"),
    (r"^S3[A-DP]_SR_2_.*", "sentinel-3-stm-l2"),
    (r"^S3[A-DP]_SY_1_.*", "sentinel-3-syn-l1"),
    (r"^S3[A-DP]_SY_2_.*", "sentinel-3-syn-l2"),
    (r"^S5[A-DP]_(OFFL|NRTI)_L1_.*", "sentinel-5p-l1"),
    (r"^S5[A-DP]_(OFFL|NRTI)_L2_.*", "sentinel-5p-l2"),
];

static PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(PRODUCT_COLLECTIONS.iter().map(|(pattern, _)| *pattern))
        .expect("collection patterns are valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRef {
    pub title: String,
    pub collection: String,
    pub feature_id: Uuid,
}

pub fn collection_for(title: &str) -> Result<&'static str, CollectionError> {
    PATTERNS
        .matches(title)
        .iter()
        .next()
        .map(|index| PRODUCT_COLLECTIONS[index].1)
        .ok_or_else(|| CollectionError::UnknownCollection(title.to_owned()))
}

pub fn feature_id(title: &str) -> Uuid {
    Uuid::new_v5(&FEATURE_NAMESPACE, title.as_bytes())
}

/// Resolves a product title, which may carry the instance `salt` as a prefix.
/// The collection comes from the unsalted title, the feature id from the full one.
pub fn identify(title: &str, salt: Option<&str>) -> Result<ProductRef, CollectionError> {
    let unsalted = match salt {
        Some(salt) if !salt.is_empty() && title.contains(salt) => {
            title.split(salt).nth(1).unwrap_or(title)
        }
        _ => title,
    };
    Ok(ProductRef {
        title: title.to_owned(),
        collection: collection_for(unsalted)?.to_owned(),
        feature_id: feature_id(title),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const S2_TITLE: &str = "S2A_MSIL2A_20240504T195901_N0510_R128_T08VPH_20240505T015750";
    const SALTED_S3_TITLE: &str = "dhr1S3B_SY_2_VG1____20240701T000000_20240701T235959_20240702T122854_EUROPE____________PS2_O_ST_002";

    #[test]
    fn test_collection_mapping() {
        let cases = [
            ("S1A_IW_GRDH_1SDV_20240701T051512_20240701T051537_054547_06A3A4_6F1C", "sentinel-1-grd"),
            ("S1B_EW_SLC__1SDH_20211201T000000", "sentinel-1-slc"),
            ("S2B_MSIL1C_20240701T100029_N0510_R122_T33UVR_20240701T120521", "sentinel-2-l1c"),
            (S2_TITLE, "sentinel-2-l2a"),
            ("S3A_OL_1_EFR____20240701T091230_20240701T091530_20240702T100120_0179_114_093_2160_PS1_O_NT_004", "sentinel-3-olci-l1b"),
            ("S3A_SL_2_LST____20240701T091230", "sentinel-3-slstr-l2"),
            ("S5P_OFFL_L2__NO2____20240701T013339_20240701T031509_34865_03_020600", "sentinel-5p-l2"),
            ("S5P_NRTI_L1__RA_BD1_20240701T013339", "sentinel-5p-l1"),
        ];
        for (title, collection) in cases {
            assert_eq!(collection_for(title), Ok(collection), "{title}");
        }
    }

    #[test]
    fn test_unknown_collection() {
        assert_eq!(
            collection_for("LC09_L2SP_191026_20240701"),
            Err(CollectionError::UnknownCollection("LC09_L2SP_191026_20240701".to_string()))
        );
    }

    #[test]
    fn test_feature_id_is_deterministic() {
        assert_eq!(
            feature_id(S2_TITLE).to_string(),
            "da08287e-8d1d-5429-8464-6e9853d2881d"
        );
    }

    #[test]
    fn test_identify_salted_title() {
        let product = identify(SALTED_S3_TITLE, Some("dhr1")).unwrap();
        assert_eq!(product.collection, "sentinel-3-syn-l2");
        assert_eq!(
            product.feature_id.to_string(),
            "10136e4a-35ad-5d3d-b5a7-ebbcaec72fed"
        );
        assert!(identify(SALTED_S3_TITLE, None).is_err());
    }

    #[test]
    fn test_identify_ignores_absent_salt() {
        let product = identify(S2_TITLE, Some("dhr1")).unwrap();
        assert_eq!(product.collection, "sentinel-2-l2a");
        assert_eq!(product.feature_id, feature_id(S2_TITLE));
    }
}
