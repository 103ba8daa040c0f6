use triage_core::{Coordinates, LanguageLabel, Manager, ManagerId, ManagerPosition, Office, Segment, TicketType};

const EARTH_RADIUS_KM: f64 = 6371.0;
const GEO_FALLBACK_RADIUS_KM: f64 = 50.0;
const GEO_RADIUS_MULTIPLIER: f64 = 1.5;

fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().asin()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Vip,
    Position,
    Language,
}

/// Routing input for one ticket; fields named to match what a caller already
/// has on hand after enrichment (no coupling to the Ticket/AIAnalysis shape).
pub struct RouteRequest {
    pub segment: Segment,
    pub ticket_type: TicketType,
    pub language_label: LanguageLabel,
    pub coordinates: Option<Coordinates>,
}

pub struct Candidate<'a> {
    pub manager: &'a Manager,
    pub office: &'a Office,
}

#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub manager_id: ManagerId,
    pub office_name: String,
    pub distance_km: Option<f64>,
    pub explanation: String,
    pub relaxations_applied: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub explanation: String,
}

fn required_skills(req: &RouteRequest) -> Vec<Requirement> {
    let mut reqs = Vec::new();
    if matches!(req.segment, Segment::Vip | Segment::Priority) {
        reqs.push(Requirement::Vip);
    }
    if req.ticket_type == TicketType::DataChange {
        reqs.push(Requirement::Position);
    }
    if matches!(req.language_label, LanguageLabel::Kz | LanguageLabel::Eng) {
        reqs.push(Requirement::Language);
    }
    reqs
}

fn matches_requirements<'a>(
    candidates: &[Candidate<'a>],
    requirements: &[Requirement],
    language_label: LanguageLabel,
) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            requirements.iter().all(|req| match req {
                Requirement::Vip => c.manager.skills.iter().any(|s| s == "VIP"),
                Requirement::Position => c.manager.position == ManagerPosition::ChiefSpecialist,
                Requirement::Language => {
                    c.manager.skills.iter().any(|s| s == &language_label.to_string())
                }
            })
        })
        .map(|(i, _)| i)
        .collect()
}

fn relaxation_label(req: Requirement) -> &'static str {
    match req {
        Requirement::Language => "language skill",
        Requirement::Position => "chief specialist position",
        Requirement::Vip => "VIP skill",
    }
}

/// Skill filter with the fixed language -> position -> VIP relaxation order.
/// Returns indices into `candidates` plus the relaxation labels applied.
fn skill_filter<'a>(
    candidates: &[Candidate<'a>],
    req: &RouteRequest,
) -> Result<(Vec<usize>, Vec<String>), RouteFailure> {
    let requirements = required_skills(req);
    let eligible = matches_requirements(candidates, &requirements, req.language_label);
    if !eligible.is_empty() {
        return Ok((eligible, Vec::new()));
    }

    let relaxation_order = [Requirement::Language, Requirement::Position, Requirement::Vip];
    for drop in relaxation_order {
        if !requirements.contains(&drop) {
            continue;
        }
        let reduced: Vec<Requirement> = requirements.iter().copied().filter(|r| *r != drop).collect();
        let eligible = matches_requirements(candidates, &reduced, req.language_label);
        if !eligible.is_empty() {
            return Ok((eligible, vec![relaxation_label(drop).to_string()]));
        }
    }

    Err(RouteFailure { explanation: "no candidates".to_string() })
}

/// Geo filter: admit managers whose office is within max(d_min * 1.5, 50km).
/// Skips filtering entirely if no candidate office has coordinates.
fn geo_filter<'a>(
    candidates: &[Candidate<'a>],
    eligible: &[usize],
    ticket_coords: Option<Coordinates>,
) -> (Vec<usize>, Vec<(usize, f64)>) {
    let Some(ticket_coords) = ticket_coords else {
        return (eligible.to_vec(), Vec::new());
    };

    let distances: Vec<(usize, f64)> = eligible
        .iter()
        .filter_map(|&i| {
            candidates[i].office.coordinates.map(|office_coords| (i, haversine_km(ticket_coords, office_coords)))
        })
        .collect();

    if distances.is_empty() {
        return (eligible.to_vec(), Vec::new());
    }

    let min_dist = distances.iter().map(|(_, d)| *d).fold(f64::INFINITY, f64::min);
    let max_allowed = (min_dist * GEO_RADIUS_MULTIPLIER).max(GEO_FALLBACK_RADIUS_KM);

    let admitted: Vec<usize> = distances.iter().filter(|(_, d)| *d <= max_allowed).map(|(i, _)| *i).collect();
    (admitted, distances)
}

/// Route a single ticket against the current candidate pool. Callers own
/// manager cumulative-load mutation and must process tickets strictly in
/// priority order so load updates stay visible to later calls.
pub fn route_ticket<'a>(req: &RouteRequest, candidates: &[Candidate<'a>]) -> Result<RouteOutcome, RouteFailure> {
    if candidates.is_empty() {
        return Err(RouteFailure { explanation: "no candidates".to_string() });
    }

    let (skill_eligible, relaxations) = skill_filter(candidates, req)?;
    let (geo_eligible, distances) = geo_filter(candidates, &skill_eligible, req.coordinates);

    if geo_eligible.is_empty() {
        return Err(RouteFailure { explanation: "no candidates after geo filter".to_string() });
    }

    let distance_for = |idx: usize| -> Option<f64> {
        distances.iter().find(|(i, _)| *i == idx).map(|(_, d)| *d)
    };

    let best_idx = *geo_eligible
        .iter()
        .min_by(|&&a, &&b| {
            let load_a = candidates[a].manager.cumulative_load;
            let load_b = candidates[b].manager.cumulative_load;
            load_a
                .partial_cmp(&load_b)
                .unwrap()
                .then_with(|| {
                    let da = distance_for(a).unwrap_or(f64::INFINITY);
                    let db = distance_for(b).unwrap_or(f64::INFINITY);
                    da.partial_cmp(&db).unwrap()
                })
                .then_with(|| candidates[a].manager.id.cmp(&candidates[b].manager.id))
        })
        .expect("geo_eligible is non-empty");

    let chosen = &candidates[best_idx];
    let distance_km = distance_for(best_idx);

    let mut explanation = format!(
        "Assigned to {} ({}, {}).",
        chosen.manager.name, chosen.manager.position, chosen.office.name
    );
    if !relaxations.is_empty() {
        explanation.push_str(&format!(" Relaxed: {}.", relaxations.join(", ")));
    }
    if let Some(d) = distance_km {
        explanation.push_str(&format!(" Distance: {d:.1} km."));
    }

    Ok(RouteOutcome {
        manager_id: chosen.manager.id,
        office_name: chosen.office.name.clone(),
        distance_km,
        explanation,
        relaxations_applied: relaxations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Office, OfficeId, Manager, ManagerId};

    fn make_office(name: &str, coords: Option<Coordinates>) -> Office {
        Office { id: OfficeId::new_v4(), name: name.to_string(), city: name.to_string(), coordinates: coords }
    }

    fn make_manager(name: &str, office_id: OfficeId, position: ManagerPosition, skills: Vec<&str>, load: f64) -> Manager {
        Manager {
            id: ManagerId::new_v4(),
            name: name.to_string(),
            office_id,
            position,
            skills: skills.into_iter().map(String::from).collect(),
            active: true,
            cumulative_load: load,
        }
    }

    #[test]
    fn picks_least_loaded_eligible_candidate() {
        let almaty = make_office("Almaty", Some(Coordinates { latitude: 43.222, longitude: 76.8512 }));
        let m1 = make_manager("Aset", almaty.id, ManagerPosition::Specialist, vec![], 5.0);
        let m2 = make_manager("Dana", almaty.id, ManagerPosition::Specialist, vec![], 1.0);
        let candidates = vec![
            Candidate { manager: &m1, office: &almaty },
            Candidate { manager: &m2, office: &almaty },
        ];
        let req = RouteRequest {
            segment: Segment::Mass,
            ticket_type: TicketType::Consultation,
            language_label: LanguageLabel::Ru,
            coordinates: Some(Coordinates { latitude: 43.25, longitude: 76.9 }),
        };
        let outcome = route_ticket(&req, &candidates).expect("should route");
        assert_eq!(outcome.manager_id, m2.id);
    }

    #[test]
    fn relaxes_vip_requirement_when_no_vip_manager_exists() {
        let almaty = make_office("Almaty", None);
        let m1 = make_manager("Aset", almaty.id, ManagerPosition::Specialist, vec![], 0.0);
        let candidates = vec![Candidate { manager: &m1, office: &almaty }];
        let req = RouteRequest {
            segment: Segment::Vip,
            ticket_type: TicketType::Consultation,
            language_label: LanguageLabel::Ru,
            coordinates: None,
        };
        let outcome = route_ticket(&req, &candidates).expect("should route after relaxing VIP");
        assert!(outcome.relaxations_applied.iter().any(|r| r.contains("VIP")));
    }

    #[test]
    fn fails_when_no_candidates_at_all() {
        let req = RouteRequest {
            segment: Segment::Mass,
            ticket_type: TicketType::Consultation,
            language_label: LanguageLabel::Ru,
            coordinates: None,
        };
        let result = route_ticket(&req, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_office_coordinates_skips_geo_filter() {
        let office = make_office("NoCoords", None);
        let m1 = make_manager("Aset", office.id, ManagerPosition::Specialist, vec![], 0.0);
        let candidates = vec![Candidate { manager: &m1, office: &office }];
        let req = RouteRequest {
            segment: Segment::Mass,
            ticket_type: TicketType::Consultation,
            language_label: LanguageLabel::Ru,
            coordinates: Some(Coordinates { latitude: 0.0, longitude: 0.0 }),
        };
        assert!(route_ticket(&req, &candidates).is_ok());
    }
}
