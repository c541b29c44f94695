//! Initial trash placement.

use ecobot_types::{CollectibleItem, Vec3};
use rand::Rng;

/// Scatter `count` items uniformly over the square `[-half_extent, half_extent)²`
/// on the water surface.
///
/// Ids form the dense sequence `"0"`, `"1"`, … `"count-1"`.  `half_extent`
/// must be positive.
pub fn scatter_items<R: Rng + ?Sized>(
    count: usize,
    half_extent: f32,
    rng: &mut R,
) -> Vec<CollectibleItem> {
    (0..count)
        .map(|i| {
            let x = rng.gen_range(-half_extent..half_extent);
            let z = rng.gen_range(-half_extent..half_extent);
            CollectibleItem::new(i.to_string(), Vec3::new(x, 0.0, z))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn ids_are_dense_and_positions_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let items = scatter_items(20, 20.0, &mut rng);
        assert_eq!(items.len(), 20);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.id, i.to_string());
            assert!(!item.collected);
            assert_eq!(item.position.y, 0.0);
            assert!(item.position.x >= -20.0 && item.position.x < 20.0);
            assert!(item.position.z >= -20.0 && item.position.z < 20.0);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let a = scatter_items(5, 20.0, &mut ChaCha8Rng::seed_from_u64(99));
        let b = scatter_items(5, 20.0, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_items() {
        let items = scatter_items(0, 20.0, &mut ChaCha8Rng::seed_from_u64(1));
        assert!(items.is_empty());
    }
}
