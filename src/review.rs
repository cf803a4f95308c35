//! A literature review: the works table and the entity registries built from it

use crate::config::SeedEntry;
use crate::crawler::{CrawlEngine, CrawlReport};
use crate::identity::is_unidentified;
use crate::model::{AffiliationDetails, Work};
use crate::registry::{Affiliations, Authors, Funders, Insertion, Record, Works};
use tracing::{debug, info};

fn seed_work(seed: &SeedEntry) -> Work {
    let mut work = Work {
        doi: seed.doi.clone(),
        link: seed.link.clone(),
        title: seed.title.clone(),
        date: seed.date.clone(),
        ..Default::default()
    };
    for name in &seed.authors {
        work = work.with_author(name);
    }
    work
}

/// Owns the four registries of one review
#[derive(Debug, Clone, Default)]
pub struct Review {
    pub name: String,
    pub works: Works,
    pub authors: Authors,
    pub funders: Funders,
    pub affiliations: Affiliations,
}

impl Review {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_work(&mut self, work: Work) -> Insertion {
        self.works.insert(work)
    }

    /// Adds a configured seed as a work
    pub fn add_seed(&mut self, seed: &SeedEntry) -> Insertion {
        self.add_work(seed_work(seed))
    }

    /// Adds the seeds that no existing row already describes
    ///
    /// A resumed review holds its seeds in enriched form, under IDs that no
    /// longer match the bare seed, so they are matched by entity instead.
    ///
    /// # Returns
    ///
    /// The number of seeds added
    pub fn add_seeds(&mut self, seeds: &[SeedEntry]) -> usize {
        let mut added = 0;
        for seed in seeds {
            let work = seed_work(seed);
            if self.works.rows().any(|row| row.same_entity(&work)) {
                debug!("Seed already in review: {:?}", seed);
                continue;
            }
            self.add_work(work);
            added += 1;
        }
        added
    }

    /// Crawls from every work in the review, then rebuilds the entity registries
    pub async fn crawl(&mut self, engine: &mut CrawlEngine) -> CrawlReport {
        let report = engine.crawl(&mut self.works).await;
        self.update_entities();
        report
    }

    /// Populates authors, funders and affiliations from the works table
    ///
    /// Each author gets the work in its publications and the IDs of its
    /// affiliations; each affiliation lists its member authors; each funder
    /// lists the works it funded. Author IDs are written back onto the works.
    pub fn update_entities(&mut self) {
        self.works.sync();

        for index in 0..self.works.len() {
            let Some(work) = self.works.row(index).cloned() else {
                continue;
            };
            let Some(work_id) = work.work_id.clone() else {
                continue;
            };

            let mut author_ids = Vec::with_capacity(work.authors.len());
            for author in &work.authors {
                let insertion = self.authors.insert(author.clone());
                if is_unidentified(&insertion.id) {
                    author_ids.push(None);
                    continue;
                }

                let affiliation_ids: Vec<String> = author
                    .affiliations
                    .iter()
                    .filter(|name| !name.trim().is_empty())
                    .map(|name| self.affiliations.insert(AffiliationDetails::named(name.trim())).id)
                    .collect();

                for affiliation_id in &affiliation_ids {
                    if let Ok(affiliation) = self.affiliations.get_mut(affiliation_id) {
                        if !affiliation.members.contains(&insertion.id) {
                            affiliation.members.push(insertion.id.clone());
                        }
                    }
                }

                if let Ok(entry) = self.authors.get_mut(&insertion.id) {
                    if !entry.publications.contains(&work_id) {
                        entry.publications.push(work_id.clone());
                    }
                    for affiliation_id in affiliation_ids {
                        if !entry.affiliations.contains(&affiliation_id) {
                            entry.affiliations.push(affiliation_id);
                        }
                    }
                }
                author_ids.push(Some(insertion.id));
            }

            for funder in &work.funders {
                let insertion = self.funders.insert(funder.clone());
                if is_unidentified(&insertion.id) {
                    continue;
                }
                if let Ok(entry) = self.funders.get_mut(&insertion.id) {
                    if !entry.funded_works.contains(&work_id) {
                        entry.funded_works.push(work_id.clone());
                    }
                }
            }

            if author_ids.iter().any(Option::is_some) {
                if let Some(row) = self.works.row_mut(index) {
                    for (author, id) in row.authors.iter_mut().zip(author_ids) {
                        if id.is_some() {
                            author.author_id = id;
                        }
                    }
                }
            }
        }

        self.sync();
        info!(
            "Review '{}': {} works, {} authors, {} funders, {} affiliations",
            self.name,
            self.works.len(),
            self.authors.len(),
            self.funders.len(),
            self.affiliations.len()
        );
    }

    /// Syncs all four registries
    pub fn sync(&mut self) {
        self.works.sync();
        self.authors.sync();
        self.funders.sync();
        self.affiliations.sync();
    }

    /// Folds another review into this one, registry by registry
    pub fn merge(&mut self, other: Review) {
        debug!("Merging review '{}' into '{}'", other.name, self.name);
        self.works.merge(other.works);
        self.authors.merge(other.authors);
        self.funders.merge(other.funders);
        self.affiliations.merge(other.affiliations);
    }
}
