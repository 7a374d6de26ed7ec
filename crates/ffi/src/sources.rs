//! Source list and meteorology editing
use plume_core::{AtmosphericConditions, DispersionMode, EmissionSource, StabilityClass};
use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error::{DefaultPlumeError, PlumeErrorCode};
use crate::helpers::{handle_ffi_result, instance_from_ptr, lock};
use crate::instance::PlumeInstance;

/// Meteorology as passed from C.
///
/// `stability_class` is the ASCII class letter (`'A'`..`'F'`); anything else
/// falls back to neutral `'D'`. `dispersion_mode` is 0 for isotropic and 1 for
/// anisotropic.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlumeConditions {
    /// m/s at plume height
    pub wind_speed: f64,
    /// Degrees the wind blows FROM, 0 = north, clockwise
    pub wind_direction: f64,
    pub stability_class: u8,
    pub dispersion_mode: u8,
    /// Scale of the anisotropic adjustments, 0 disables them
    pub wind_effect_strength: f64,
}

impl TryFrom<&PlumeConditions> for AtmosphericConditions {
    type Error = DefaultPlumeError;

    fn try_from(raw: &PlumeConditions) -> Result<Self, Self::Error> {
        if !raw.wind_speed.is_finite() || raw.wind_speed < 0.0 {
            return Err(DefaultPlumeError::invalid_parameter(
                "wind_speed",
                &format!("must be finite and non-negative, got {}", raw.wind_speed),
            ));
        }
        if !raw.wind_direction.is_finite() {
            return Err(DefaultPlumeError::invalid_parameter(
                "wind_direction",
                "must be finite",
            ));
        }
        if !raw.wind_effect_strength.is_finite() || raw.wind_effect_strength < 0.0 {
            return Err(DefaultPlumeError::invalid_parameter(
                "wind_effect_strength",
                &format!("must be finite and non-negative, got {}", raw.wind_effect_strength),
            ));
        }
        let mode = match raw.dispersion_mode {
            0 => DispersionMode::Isotropic,
            1 => DispersionMode::Anisotropic,
            other => {
                return Err(DefaultPlumeError::invalid_parameter(
                    "dispersion_mode",
                    &format!("must be 0 or 1, got {other}"),
                ))
            }
        };
        let class = StabilityClass::from_code(&char::from(raw.stability_class).to_string());

        let mut conditions =
            AtmosphericConditions::new(raw.wind_speed, raw.wind_direction, class).with_mode(mode);
        conditions.wind_effect_strength = raw.wind_effect_strength;
        Ok(conditions)
    }
}

/// Emission source as passed from C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlumeSource {
    pub id: u32,
    pub lat: f64,
    pub lng: f64,
    /// Effective release height in meters
    pub stack_height: f64,
    /// Grams per second
    pub emission_rate: f64,
}

fn validate_source(raw: &PlumeSource) -> Result<(), DefaultPlumeError> {
    if !raw.lat.is_finite() || !(-90.0..=90.0).contains(&raw.lat) {
        return Err(DefaultPlumeError::invalid_parameter(
            "lat",
            &format!("must lie in [-90, 90], got {}", raw.lat),
        ));
    }
    if !raw.lng.is_finite() || !(-180.0..=180.0).contains(&raw.lng) {
        return Err(DefaultPlumeError::invalid_parameter(
            "lng",
            &format!("must lie in [-180, 180], got {}", raw.lng),
        ));
    }
    for (name, value) in [
        ("stack_height", raw.stack_height),
        ("emission_rate", raw.emission_rate),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(DefaultPlumeError::invalid_parameter(
                name,
                &format!("must be finite and non-negative, got {value}"),
            ));
        }
    }
    Ok(())
}

/// Append a source to the instance's source list.
///
/// `name` may be null; the source is then called "Source <id>".
///
/// Returns
/// - `PlumeErrorCode::Ok` on success
/// - `PlumeErrorCode::NullPointer` if `ptr` or `source` is null
/// - `PlumeErrorCode::InvalidParameter` for out-of-range coordinates, negative height or rate
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `source` must be null or point to a valid `PlumeSource`.
/// - `name` must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn plume_add_source(
    ptr: *const PlumeInstance,
    source: *const PlumeSource,
    name: *const c_char,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        // SAFETY: checked for null by `as_ref`; caller guarantees validity.
        let raw = unsafe { source.as_ref() }
            .ok_or_else(|| DefaultPlumeError::null_pointer("source"))?;
        validate_source(raw)?;

        let mut emission = EmissionSource::new(
            raw.id,
            raw.lat,
            raw.lng,
            raw.stack_height,
            raw.emission_rate,
        );
        if !name.is_null() {
            // SAFETY: caller guarantees a null-terminated string.
            let name = unsafe { CStr::from_ptr(name) };
            emission = emission.named(name.to_string_lossy());
        }

        lock(&instance.sources, "sources")?.push(emission);
        Ok(())
    })
}

/// Give the source with `source_id` its own meteorology, overriding the
/// instance conditions for that source. Null `conditions` removes the override.
///
/// Returns `PlumeErrorCode::InvalidParameter` if no source has that id.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `conditions` must be null or point to a valid `PlumeConditions`.
#[no_mangle]
pub unsafe extern "C" fn plume_set_source_conditions(
    ptr: *const PlumeInstance,
    source_id: u32,
    conditions: *const PlumeConditions,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        // SAFETY: null handled below; caller guarantees validity otherwise.
        let meteorology = match unsafe { conditions.as_ref() } {
            Some(raw) => Some(AtmosphericConditions::try_from(raw)?),
            None => None,
        };

        let mut sources = lock(&instance.sources, "sources")?;
        let mut found = false;
        for source in sources.iter_mut().filter(|s| s.id == source_id) {
            source.meteorology = meteorology;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(DefaultPlumeError::invalid_parameter(
                "source_id",
                &format!("no source with id {source_id}"),
            ))
        }
    })
}

/// Remove every source from the instance.
///
/// # Safety
/// `ptr` must be null or a live pointer from `plume_new`.
#[no_mangle]
pub unsafe extern "C" fn plume_clear_sources(ptr: *const PlumeInstance) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        lock(&instance.sources, "sources")?.clear();
        Ok(())
    })
}

/// Number of sources currently held, written to `out_count`.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `out_count` must be null or a valid pointer to write a `usize` to.
#[no_mangle]
pub unsafe extern "C" fn plume_source_count(
    ptr: *const PlumeInstance,
    out_count: *mut usize,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        if out_count.is_null() {
            return Err(DefaultPlumeError::null_pointer("out_count"));
        }
        let instance = instance_from_ptr(ptr)?;
        let count = lock(&instance.sources, "sources")?.len();
        unsafe {
            *out_count = count;
        }
        Ok(())
    })
}

/// Replace the pass-wide meteorology.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `conditions` must be null or point to a valid `PlumeConditions`.
#[no_mangle]
pub unsafe extern "C" fn plume_set_conditions(
    ptr: *const PlumeInstance,
    conditions: *const PlumeConditions,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        // SAFETY: checked for null by `as_ref`; caller guarantees validity.
        let raw = unsafe { conditions.as_ref() }
            .ok_or_else(|| DefaultPlumeError::null_pointer("conditions"))?;
        let parsed = AtmosphericConditions::try_from(raw)?;
        *lock(&instance.conditions, "conditions")? = parsed;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn westerly() -> PlumeConditions {
        PlumeConditions {
            wind_speed: 3.0,
            wind_direction: 270.0,
            stability_class: b'c',
            dispersion_mode: 1,
            wind_effect_strength: 0.5,
        }
    }

    #[test]
    fn test_conditions_conversion() {
        let parsed = AtmosphericConditions::try_from(&westerly()).unwrap();
        assert_eq!(parsed.stability_class, StabilityClass::C);
        assert_eq!(parsed.dispersion_mode, DispersionMode::Anisotropic);
        assert_eq!(parsed.wind_effect_strength, 0.5);

        let garbled = PlumeConditions {
            stability_class: b'?',
            ..westerly()
        };
        assert_eq!(
            AtmosphericConditions::try_from(&garbled).unwrap().stability_class,
            StabilityClass::D
        );
    }

    #[test]
    fn test_bad_conditions_rejected() {
        for raw in [
            PlumeConditions { wind_speed: f64::NAN, ..westerly() },
            PlumeConditions { wind_speed: -1.0, ..westerly() },
            PlumeConditions { dispersion_mode: 7, ..westerly() },
            PlumeConditions { wind_effect_strength: -0.1, ..westerly() },
        ] {
            assert!(AtmosphericConditions::try_from(&raw).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn test_source_validation() {
        let good = PlumeSource {
            id: 1,
            lat: 55.7558,
            lng: 37.6173,
            stack_height: 40.0,
            emission_rate: 3.7,
        };
        assert!(validate_source(&good).is_ok());
        assert!(validate_source(&PlumeSource { lat: 91.0, ..good }).is_err());
        assert!(validate_source(&PlumeSource { emission_rate: -2.0, ..good }).is_err());
        assert!(validate_source(&PlumeSource { stack_height: f64::INFINITY, ..good }).is_err());
    }
}
