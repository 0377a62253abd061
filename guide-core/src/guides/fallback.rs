use std::collections::BTreeMap;

use crate::model::GuideRecord;

/// `(id, title, description, latitude, longitude)`; every spot is in Bohol.
const SPOTS: [(&str, &str, &str, f64, f64); 9] = [
    (
        "1",
        "Chocolate Hills",
        "Unique geological formations of over 1,200 hills that turn brown during dry season. Perfect for hiking and panoramic views.",
        9.8297,
        124.1397,
    ),
    (
        "2",
        "Panglao Beach",
        "Beautiful white sand beach with crystal clear waters. Ideal for swimming, snorkeling, and relaxation.",
        9.6268,
        123.8056,
    ),
    (
        "3",
        "Tarsier Conservation Area",
        "Home to the world's smallest primate. Learn about conservation efforts and observe these tiny creatures in their natural habitat.",
        9.6912,
        123.9529,
    ),
    (
        "4",
        "Loboc River Cruise",
        "Scenic river cruise with floating restaurants serving local delicacies. Enjoy the lush scenery and traditional music.",
        9.6348,
        124.0298,
    ),
    (
        "5",
        "Baclayon Church",
        "Historic church built in 1595, one of the oldest stone churches in the Philippines. Features intricate carvings and colonial architecture.",
        9.6229,
        123.9125,
    ),
    (
        "6",
        "Trinidad Kawasan Falls",
        "Multi-tiered waterfall with natural pools. Requires a short hike through lush forest trails.",
        10.0623,
        124.3421,
    ),
    (
        "7",
        "Blood Compact Shrine",
        "Historic site commemorating the first blood compact between Spaniards and Filipinos in 1565.",
        9.6273,
        123.8788,
    ),
    (
        "8",
        "Bohol Bee Farm",
        "Learn about stingless bees and taste organic honey products. Includes butterfly garden and mini zoo.",
        9.5757,
        123.8271,
    ),
    (
        "9",
        "Anda White Long Beach",
        "This is a soulful place where the everyday stresses of life are left behind, and you can reconnect with nature, we call it luxury comfort.",
        9.7417,
        124.5758,
    ),
];

/// Built-in guides used when the remote store has nothing to offer.
pub fn fallback_guides() -> Vec<GuideRecord> {
    SPOTS
        .iter()
        .map(|&(id, title, description, latitude, longitude)| GuideRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            location: "Bohol".to_string(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            rating: None,
            entry_fee: None,
            best_time: None,
            extra: BTreeMap::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_in_order() {
        let guides = fallback_guides();
        let ids: Vec<_> = guides.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6", "7", "8", "9"]);

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), guides.len());
    }

    #[test]
    fn every_spot_is_on_the_island() {
        for g in fallback_guides() {
            let (lat, lon) = g.coordinates().expect("fallback spots have coordinates");
            assert!(crate::geo::within_island(lat, lon), "{} is off the island", g.title);
        }
    }
}
