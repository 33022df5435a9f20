//! C API for box coverings

use std::slice::from_raw_parts_mut;

use crate::{
    c_api::Status,
    constants::NSIBLINGS,
    covering,
    types::{domain::Domain, key::KeyType, Bounds, PointType},
};

/// Scale factor of the global box, see `Domain::scale`.
#[no_mangle]
pub extern "C" fn partition_domain_scale(p_global_box: *const Bounds) -> PointType {
    match unsafe { p_global_box.as_ref() } {
        Some(global_box) => Domain::new(*global_box).scale(),
        None => PointType::NAN,
    }
}

/// Cover a box, writing up to eight packed keys to `p_keys`.
#[no_mangle]
pub extern "C" fn partition_box_covering(
    p_global_box: *const Bounds,
    p_small_box: *const Bounds,
    scale: PointType,
    p_keys: *mut KeyType,
    p_count: *mut usize,
    p_exact: *mut bool,
) -> Status {
    let (global_box, small_box) = match unsafe { (p_global_box.as_ref(), p_small_box.as_ref()) } {
        (Some(global_box), Some(small_box)) => (global_box, small_box),
        _ => return Status::NullPointer,
    };
    if p_keys.is_null() || p_count.is_null() || p_exact.is_null() {
        return Status::NullPointer;
    }

    match covering::box_covering(global_box, small_box, scale) {
        Ok(covering) => {
            let keys = unsafe { from_raw_parts_mut(p_keys, NSIBLINGS as usize) };
            for (slot, key) in keys.iter_mut().zip(covering.keys()) {
                *slot = key.value();
            }
            unsafe {
                *p_count = covering.len();
                *p_exact = covering.is_exact();
            }
            Status::Ok
        }
        Err(e) => Status::from(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::ptr;

    use crate::types::key::OctTreeKey;

    const UNIT: Bounds = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

    #[test]
    fn test_box_covering() {
        let small_box = [0.24, 0.24, 0.24, 0.26, 0.26, 0.26];
        let mut keys = [0; 8];
        let mut count = 0;
        let mut exact = false;

        let status = partition_box_covering(
            &UNIT,
            &small_box,
            partition_domain_scale(&UNIT),
            keys.as_mut_ptr(),
            &mut count,
            &mut exact,
        );

        assert_eq!(status, Status::Ok);
        let expected = covering::box_covering(&UNIT, &small_box, 1.0).unwrap();
        assert_eq!(count, expected.len());
        assert!(exact);
        for (value, key) in keys.iter().zip(expected.keys()) {
            assert_eq!(OctTreeKey::from_value(*value), Some(*key));
        }
    }

    #[test]
    fn test_box_covering_errors() {
        let small_box = [0.1, 0.1, 0.1, 0.2, 0.2, 0.2];
        let mut keys = [0; 8];
        let mut count = 0;
        let mut exact = false;

        let status = partition_box_covering(
            ptr::null(),
            &small_box,
            1.0,
            keys.as_mut_ptr(),
            &mut count,
            &mut exact,
        );
        assert_eq!(status, Status::NullPointer);

        let status = partition_box_covering(
            &UNIT,
            &small_box,
            f64::INFINITY,
            keys.as_mut_ptr(),
            &mut count,
            &mut exact,
        );
        assert_eq!(status, Status::DepthDetermination);

        assert!(partition_domain_scale(ptr::null()).is_nan());
    }
}
