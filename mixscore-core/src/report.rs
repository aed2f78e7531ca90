//! Tab-separated report rendering in the legacy column layout.
//!
//! Each record starts with the site id, followed by the alternative fit
//! (negative log-likelihood, then parameters), the null fit, and the test
//! columns. Fits that did not converge are written as `NA` with the legacy
//! warning text in place of the statistic.

use std::io::Write;

use anyhow::{bail, Result};

use crate::assoc::{Algorithm, ComparisonResult, SiteTest};
use crate::model::FitOutcome;
use crate::permutation::PermutationOutcome;

const NA: &str = "NA";
const CONVERGENCE_WARNING: &str =
    "WARNING:Convergence_failed,_Probably_no_admixture_at_this_site_in_case/control_or_both!";
const MAF_WARNING: &str = "WARNING:MAF_is_0_at_this_site_in_case/control_or_both!";

/// Format with four decimals, dropping trailing zeros.
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return NA.to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    let text = format!("{:.4}", value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn header(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::Snp1 => "SNPID\tLogSameRatio\tpa\tpe\tr\tLogOnlyFre\tpa\tpe\tDF\tchisq",
        Algorithm::Het1 => {
            "SNPID\tLogTwoRatios\tpa\tpe\tra\tre\tLogSameRatio\tpa\tpe\tr\tDF\tchisq"
        }
        Algorithm::Het2 => "SNPID\tLogTwoRatios\tpa\tpe\tra\tre\tLogOnlyFre\tpa\tpe\tDF\tchisq",
        Algorithm::Hap1 => {
            "SNPID\tLogHapSameRatio\tpRefPop1Ctrl\tpRefPop2Ctrl\tr\tLogOnlyFre\tpRefPop1\tpRefPop2\tDF\tchisq"
        }
        Algorithm::Hap2 => {
            "SNPID\tLogHap2Ratios\tpRefPop1Ctrl\tpRefPop2Ctrl\tr1\tr2\tLogOnlyFre\tpRefPop1\tpRefPop2\tDF\tchisq"
        }
        Algorithm::Adm => "SNPID\t2LogDiff\tOmiga4Pop1\tDF",
        Algorithm::AdmHap2 => {
            "SNPID\tLogHap2Ratios\tpRefPop1Ctrl\tpRefPop2Ctrl\tr1\tr2\tLogOnlyFre\tpRefPop1\tpRefPop2\tchisqHap2\tchisqAMD\tomiga\tDF\ttotalChisq"
        }
    }
}

pub fn write_header(writer: &mut impl Write, algorithm: Algorithm) -> Result<()> {
    writeln!(writer, "{}", header(algorithm))?;
    Ok(())
}

/// Negative log-likelihood and parameters; `NA` unless the fit converged.
fn fit_fields(outcome: &FitOutcome, arity: usize) -> Vec<String> {
    match outcome.converged() {
        Some(fit) => std::iter::once(fit.neg_log_likelihood)
            .chain(fit.parameters.iter().copied())
            .map(format_decimal)
            .collect(),
        None => vec![NA.to_string(); arity + 1],
    }
}

fn comparison_fields(result: &ComparisonResult) -> Vec<String> {
    let mut fields = fit_fields(&result.alt, result.comparison.alt.arity());
    fields.extend(fit_fields(&result.null, result.comparison.null.arity()));
    fields
}

/// DF and statistic, or `NA` pair plus warning. Failure wins over degeneracy.
fn status_fields(
    failed: bool,
    degenerate: bool,
    degrees_of_freedom: usize,
    chi_square: f64,
) -> Vec<String> {
    if failed {
        vec![NA.into(), NA.into(), CONVERGENCE_WARNING.into()]
    } else if degenerate {
        vec![NA.into(), NA.into(), MAF_WARNING.into()]
    } else {
        vec![degrees_of_freedom.to_string(), format_decimal(chi_square)]
    }
}

fn omega(result: &ComparisonResult) -> String {
    result
        .alt
        .converged()
        .and_then(|fit| fit.parameters.first().copied())
        .map_or_else(|| NA.to_string(), format_decimal)
}

/// Write one site record in the layout of its algorithm.
pub fn write_site(writer: &mut impl Write, test: &SiteTest) -> Result<()> {
    let mut fields = vec![test.site_id.clone()];
    match (test.algorithm, test.comparisons.as_slice()) {
        (Algorithm::Adm, [adm]) => {
            fields.push(format_decimal(adm.chi_square()));
            fields.push(omega(adm));
            fields.push(test.degrees_of_freedom().to_string());
        }
        (Algorithm::AdmHap2, [hap, adm]) => {
            fields.extend(comparison_fields(hap));
            fields.push(format_decimal(hap.chi_square()));
            fields.push(format_decimal(adm.chi_square()));
            fields.push(omega(adm));
            fields.extend(status_fields(
                test.is_failed(),
                test.is_degenerate(),
                test.degrees_of_freedom(),
                test.chi_square(),
            ));
        }
        (_, [result]) => {
            fields.extend(comparison_fields(result));
            fields.extend(status_fields(
                result.is_failed(),
                result.is_degenerate(),
                test.degrees_of_freedom(),
                result.chi_square(),
            ));
        }
        _ => bail!(
            "site {}: {} comparisons do not match algorithm {}",
            test.site_id,
            test.comparisons.len(),
            test.algorithm
        ),
    }
    writeln!(writer, "{}", fields.join("\t"))?;
    Ok(())
}

pub fn write_permutation_header(writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "SNPID\tOriginal2*LogDiff\tsmallerNum\tEqualorLargerNum")?;
    Ok(())
}

pub fn write_permutation_line(
    writer: &mut impl Write,
    site_id: &str,
    outcome: &PermutationOutcome,
) -> Result<()> {
    writeln!(
        writer,
        "{}\t{}\t{}\t{}",
        site_id,
        format_decimal(outcome.original),
        outcome.smaller,
        outcome.larger_or_equal
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assoc::Comparison;
    use crate::assoc::LikelihoodRatioTest;
    use crate::model::{Degeneracy, FitFailure, ModelFit, ModelKind};
    use crate::permutation::PermutationStatus;

    fn fit(kind: ModelKind, nll: f64, parameters: Vec<f64>) -> ModelFit {
        ModelFit {
            kind,
            neg_log_likelihood: nll,
            parameters,
            evaluations: 10,
        }
    }

    fn snp1(null: FitOutcome, alt: FitOutcome) -> SiteTest {
        let test = match (null.converged(), alt.converged()) {
            (Some(n), Some(a)) => Some(LikelihoodRatioTest::new(n.clone(), a.clone()).unwrap()),
            _ => None,
        };
        SiteTest {
            site_id: "rs7".into(),
            algorithm: Algorithm::Snp1,
            comparisons: vec![ComparisonResult {
                comparison: Comparison::new(ModelKind::FrequencyOnly, ModelKind::SharedOddsRatio),
                null,
                alt,
                test,
            }],
        }
    }

    fn render(test: &SiteTest) -> String {
        let mut out = Vec::new();
        write_site(&mut out, test).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(1.0), "1");
        assert_eq!(format_decimal(0.5), "0.5");
        assert_eq!(format_decimal(0.123456), "0.1235");
        assert_eq!(format_decimal(-2.25), "-2.25");
        assert_eq!(format_decimal(-0.00001), "0");
        assert_eq!(format_decimal(120.0), "120");
        assert_eq!(format_decimal(f64::NAN), "NA");
        assert_eq!(format_decimal(f64::INFINITY), "Inf");
    }

    #[test]
    fn test_header_columns() {
        let mut out = Vec::new();
        write_header(&mut out, Algorithm::Het2).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.starts_with("SNPID\tLogTwoRatios"));
        assert!(line.ends_with("DF\tchisq\n"));
    }

    #[test]
    fn test_converged_record() {
        let test = snp1(
            FitOutcome::Converged(fit(ModelKind::FrequencyOnly, 12.5, vec![0.25, 0.75])),
            FitOutcome::Converged(fit(ModelKind::SharedOddsRatio, 10.0, vec![0.2, 0.7, 2.0])),
        );
        assert_eq!(render(&test), "rs7\t10\t0.2\t0.7\t2\t12.5\t0.25\t0.75\t1\t5\n");
    }

    #[test]
    fn test_failed_record_takes_precedence() {
        let best = fit(ModelKind::SharedOddsRatio, 10.0, vec![0.2, 0.7, 2.0]);
        let test = snp1(
            FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup),
            FitOutcome::Failed(FitFailure::EvaluationBudgetExhausted { best }),
        );
        let line = render(&test);
        assert!(line.starts_with("rs7\tNA\tNA\tNA\tNA\tNA\tNA\tNA\t"));
        assert!(line.trim_end().ends_with(&format!("NA\tNA\t{}", CONVERGENCE_WARNING)));
    }

    #[test]
    fn test_numerical_breakdown_prints_na() {
        let best = fit(ModelKind::SharedOddsRatio, 10.0, vec![0.2, 0.7, 2.0]);
        let test = snp1(
            FitOutcome::Converged(fit(ModelKind::FrequencyOnly, 12.5, vec![0.25, 0.75])),
            FitOutcome::Failed(FitFailure::NumericalBreakdown { best }),
        );
        assert_eq!(
            render(&test).trim_end(),
            format!("rs7\tNA\tNA\tNA\tNA\t12.5\t0.25\t0.75\tNA\tNA\t{}", CONVERGENCE_WARNING)
        );
    }

    fn admhap2(adm_alt: FitOutcome) -> SiteTest {
        let hap_null = fit(ModelKind::HaplotypeFrequencyOnly, 30.0, vec![0.6, 0.8]);
        let hap_alt = fit(ModelKind::HaplotypeTwoOddsRatios, 28.0, vec![0.6, 0.8, 0.5, 1.0]);
        let adm_null = fit(ModelKind::AdmixtureNull, 9.0, vec![]);
        let adm_test = adm_alt
            .converged()
            .map(|alt| LikelihoodRatioTest::new(adm_null.clone(), alt.clone()).unwrap());
        SiteTest {
            site_id: "rs11".into(),
            algorithm: Algorithm::AdmHap2,
            comparisons: vec![
                ComparisonResult {
                    comparison: Comparison::new(
                        ModelKind::HaplotypeFrequencyOnly,
                        ModelKind::HaplotypeTwoOddsRatios,
                    ),
                    null: FitOutcome::Converged(hap_null.clone()),
                    alt: FitOutcome::Converged(hap_alt.clone()),
                    test: Some(LikelihoodRatioTest::new(hap_null, hap_alt).unwrap()),
                },
                ComparisonResult {
                    comparison: Comparison::new(ModelKind::AdmixtureNull, ModelKind::Admixture),
                    null: FitOutcome::Converged(adm_null),
                    alt: adm_alt,
                    test: adm_test,
                },
            ],
        }
    }

    #[test]
    fn test_admhap2_record() {
        let adm = fit(ModelKind::Admixture, 8.0, vec![1.5]);
        let line = render(&admhap2(FitOutcome::Converged(adm)));
        assert!(line.trim_end().ends_with("\t4\t2\t1.5\t3\t6"), "{}", line);
        assert_eq!(line.trim_end().split('\t').count(), 14);
    }

    #[test]
    fn test_admhap2_failed_component_warns() {
        let best = fit(ModelKind::Admixture, 8.0, vec![1.5]);
        let test = admhap2(FitOutcome::Failed(FitFailure::EvaluationBudgetExhausted { best }));
        let line = render(&test);
        let expected = format!("\t4\tNA\tNA\tNA\tNA\t{}", CONVERGENCE_WARNING);
        assert!(line.trim_end().ends_with(&expected), "{}", line);
        assert_eq!(line.trim_end().split('\t').count(), 15);
    }

    #[test]
    fn test_admhap2_degenerate_component_warns() {
        let test = admhap2(FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup));
        let line = render(&test);
        assert!(line.trim_end().ends_with(&format!("NA\tNA\t{}", MAF_WARNING)));
    }

    #[test]
    fn test_degenerate_record() {
        let test = snp1(
            FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup),
            FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup),
        );
        let line = render(&test);
        assert_eq!(line.trim_end().split('\t').count(), 11);
        assert!(line.trim_end().ends_with(MAF_WARNING));
    }

    #[test]
    fn test_mismatched_comparisons() {
        let mut test = snp1(
            FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup),
            FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup),
        );
        test.comparisons.clear();
        assert!(write_site(&mut Vec::<u8>::new(), &test).is_err());
    }

    #[test]
    fn test_permutation_line() {
        let outcome = PermutationOutcome {
            original: 3.14159,
            smaller: 80,
            larger_or_equal: 20,
            status: PermutationStatus::EarlyStopped,
        };
        let mut out = Vec::new();
        write_permutation_header(&mut out).unwrap();
        write_permutation_line(&mut out, "rs9", &outcome).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("rs9\t3.1416\t80\t20"));
    }
}
