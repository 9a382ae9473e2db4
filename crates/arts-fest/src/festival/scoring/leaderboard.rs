use serde::Serialize;

use super::HouseScore;

/// Houses sharing one distinct score under dense ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankGroup {
    pub rank: u32,
    pub score: u32,
    pub houses: Vec<HouseScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedHouse {
    pub rank: u32,
    #[serde(flatten)]
    pub house: HouseScore,
}

/// Top three distinct scores (each possibly shared) plus everyone below them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Podium {
    pub rank1: Vec<HouseScore>,
    pub rank2: Vec<HouseScore>,
    pub rank3: Vec<HouseScore>,
    pub rest: Vec<RankedHouse>,
}

/// Highest score first; equal scores keep their input order.
fn by_score_desc(scores: &[HouseScore]) -> Vec<HouseScore> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|left, right| right.score.cmp(&left.score));
    sorted
}

/// Dense ranking: ties share a rank and the next distinct score takes the next number.
pub fn rank_dense(scores: &[HouseScore]) -> Vec<RankGroup> {
    let mut groups: Vec<RankGroup> = Vec::new();
    for house in by_score_desc(scores) {
        match groups.last_mut() {
            Some(group) if group.score == house.score => group.houses.push(house),
            _ => groups.push(RankGroup {
                rank: groups.len() as u32 + 1,
                score: house.score,
                houses: vec![house],
            }),
        }
    }
    groups
}

/// Competition ranking: ties share a rank and the next distinct score takes its 1-based position.
pub fn rank_competition(scores: &[HouseScore]) -> Vec<RankedHouse> {
    let mut ranked: Vec<RankedHouse> = Vec::with_capacity(scores.len());
    for (position, house) in by_score_desc(scores).into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(previous) if previous.house.score == house.score => previous.rank,
            _ => position as u32 + 1,
        };
        ranked.push(RankedHouse { rank, house });
    }
    ranked
}

/// Splits the dense ranking into podium tiers. Houses below the third distinct score are
/// numbered one by one, starting right after the podium headcount.
pub fn podium(scores: &[HouseScore]) -> Podium {
    let mut tiers = rank_dense(scores).into_iter().map(|group| group.houses);
    let rank1 = tiers.next().unwrap_or_default();
    let rank2 = tiers.next().unwrap_or_default();
    let rank3 = tiers.next().unwrap_or_default();

    let first_rest = (rank1.len() + rank2.len() + rank3.len()) as u32 + 1;
    let rest = tiers
        .flatten()
        .zip(first_rest..)
        .map(|(house, rank)| RankedHouse { rank, house })
        .collect();

    Podium {
        rank1,
        rank2,
        rank3,
        rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::festival::domain::HouseId;

    fn scores(entries: &[(&str, u32)]) -> Vec<HouseScore> {
        entries
            .iter()
            .map(|(id, score)| HouseScore {
                house_id: HouseId(id.to_string()),
                name: id.to_string(),
                color: "#ffffff".to_string(),
                score: *score,
            })
            .collect()
    }

    fn ids(houses: &[HouseScore]) -> Vec<&str> {
        houses.iter().map(|house| house.house_id.0.as_str()).collect()
    }

    #[test]
    fn dense_ranking_does_not_skip_after_ties() {
        let groups = rank_dense(&scores(&[("a", 10), ("b", 10), ("c", 7)]));
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].rank, ids(&groups[0].houses)), (1, vec!["a", "b"]));
        assert_eq!((groups[1].rank, ids(&groups[1].houses)), (2, vec!["c"]));

        let podium = podium(&scores(&[("a", 10), ("b", 10), ("c", 7)]));
        assert_eq!(ids(&podium.rank1), vec!["a", "b"]);
        assert_eq!(ids(&podium.rank2), vec!["c"]);
        assert!(podium.rank3.is_empty());
        assert!(podium.rest.is_empty());
    }

    #[test]
    fn competition_ranking_skips_after_ties() {
        let ranked = rank_competition(&scores(&[("a", 10), ("b", 10), ("c", 7), ("d", 7), ("e", 1)]));
        let ranks: Vec<(&str, u32)> = ranked
            .iter()
            .map(|entry| (entry.house.house_id.0.as_str(), entry.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![("a", 1), ("b", 1), ("c", 3), ("d", 3), ("e", 5)]
        );
    }

    #[test]
    fn rest_is_numbered_after_podium_headcount() {
        let podium = podium(&scores(&[
            ("e", 1),
            ("a", 9),
            ("b", 9),
            ("c", 5),
            ("d", 3),
            ("f", 0),
            ("g", 1),
        ]));
        assert_eq!(ids(&podium.rank1), vec!["a", "b"]);
        assert_eq!(ids(&podium.rank2), vec!["c"]);
        assert_eq!(ids(&podium.rank3), vec!["d"]);
        let rest: Vec<(&str, u32)> = podium
            .rest
            .iter()
            .map(|entry| (entry.house.house_id.0.as_str(), entry.rank))
            .collect();
        assert_eq!(rest, vec![("e", 5), ("g", 6), ("f", 7)]);
    }

    #[test]
    fn both_views_agree_on_order_and_cover_every_house() {
        let input = scores(&[("a", 3), ("b", 8), ("c", 3), ("d", 0), ("e", 8), ("f", 2)]);

        let dense: Vec<String> = rank_dense(&input)
            .into_iter()
            .flat_map(|group| group.houses)
            .map(|house| house.house_id.0)
            .collect();
        let competition: Vec<String> = rank_competition(&input)
            .into_iter()
            .map(|entry| entry.house.house_id.0)
            .collect();

        assert_eq!(dense, competition);
        let mut sorted = dense.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, ["a", "b", "c", "d", "e", "f"].map(String::from));
    }

    #[test]
    fn empty_input_yields_empty_views() {
        assert!(rank_dense(&[]).is_empty());
        assert!(rank_competition(&[]).is_empty());
        assert_eq!(podium(&[]), Podium::default());
    }
}
