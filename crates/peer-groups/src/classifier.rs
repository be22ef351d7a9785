use crate::states::state_abbreviation;
use core_types::{HospitalType, PeerGroupKey, PeerGroupLevel, ProviderId, RawProviderId};
use serde::Serialize;

/// The outcome of classifying one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// `None` when the identifier could not be normalized.
    pub provider_id: Option<ProviderId>,
    /// Two-digit state code, when the prefix is an assigned code.
    pub state_code: Option<String>,
    pub hospital_type: HospitalType,
    /// National first, then State, HospitalType and StateType where resolvable.
    pub peer_groups: Vec<PeerGroupKey>,
}

impl Classification {
    /// The peer group of the requested partition, if this provider has one.
    pub fn peer_group(&self, level: PeerGroupLevel) -> Option<&PeerGroupKey> {
        self.peer_groups.iter().find(|key| key.level == level)
    }

    fn national_only(provider_id: Option<ProviderId>) -> Self {
        Self {
            provider_id,
            state_code: None,
            hospital_type: HospitalType::Unknown,
            peer_groups: vec![PeerGroupKey::national()],
        }
    }
}

/// Derives the peer groups of a provider from its identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeerGroupClassifier;

impl PeerGroupClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes a raw identifier and classifies it.
    ///
    /// An identifier that cannot be normalized is benchmarked nationally only.
    pub fn classify(&self, raw: impl Into<RawProviderId>) -> Classification {
        let raw = raw.into();
        match ProviderId::normalize(raw.clone()) {
            Ok(provider_id) => self.classify_id(&provider_id),
            Err(e) => {
                tracing::warn!(provider = %raw, error = %e, "Falling back to national peer group.");
                Classification::national_only(None)
            }
        }
    }

    /// Classifies an identifier that is already in canonical form.
    pub fn classify_id(&self, provider_id: &ProviderId) -> Classification {
        let state_code = state_abbreviation(provider_id.state_prefix())
            .map(|_| provider_id.state_prefix().to_string());
        let hospital_type = hospital_type_for(provider_id.type_code());

        let mut peer_groups = vec![PeerGroupKey::national()];
        if let Some(state) = &state_code {
            peer_groups.push(PeerGroupKey::state(state));
        }
        if hospital_type != HospitalType::Unknown {
            peer_groups.push(PeerGroupKey::hospital_type(hospital_type));
            if let Some(state) = &state_code {
                peer_groups.push(PeerGroupKey::state_type(state, hospital_type));
            }
        }

        if state_code.is_none() || hospital_type == HospitalType::Unknown {
            tracing::debug!(
                provider = %provider_id,
                state = ?state_code,
                hospital_type = %hospital_type,
                "Provider only partially classified."
            );
        }

        Classification {
            provider_id: Some(provider_id.clone()),
            state_code,
            hospital_type,
            peer_groups,
        }
    }
}

/// Maps the four-character type code of a normalized identifier to a hospital type.
///
/// A letter in the first position marks a distinct-part unit of another
/// facility. Otherwise the code is a number whose range encodes the facility
/// category.
pub fn hospital_type_for(type_code: &str) -> HospitalType {
    if type_code.len() != 4 {
        return HospitalType::Unknown;
    }

    let mut chars = type_code.chars();
    let lead = chars.next().unwrap_or('0');
    if lead.is_ascii_alphabetic() {
        if !chars.all(|c| c.is_ascii_digit()) {
            return HospitalType::Unknown;
        }
        return match lead {
            'S' | 'M' => HospitalType::Psychiatric,
            'T' | 'R' => HospitalType::Rehabilitation,
            _ => HospitalType::Unknown,
        };
    }

    let Ok(code) = type_code.parse::<u16>() else {
        return HospitalType::Unknown;
    };
    match code {
        1..=899 => HospitalType::ShortTerm,
        1300..=1399 => HospitalType::CriticalAccess,
        1990..=1999 => HospitalType::Specialty,
        2000..=2299 => HospitalType::LongTerm,
        3025..=3099 => HospitalType::Rehabilitation,
        3300..=3399 => HospitalType::Childrens,
        4000..=4499 => HospitalType::Psychiatric,
        _ => HospitalType::Unknown,
    }
}
