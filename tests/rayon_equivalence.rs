#![cfg(feature = "rayon")]

use framematch::lowlevel::{
    scan_full_par, score_map_par, CcoeffNormedScalar, CcorrNormedScalar, Kernel, ScanParams,
    SqdiffNormedScalar, TemplatePlan,
};
use framematch::{Frame, Region};

fn make_frame(width: usize, height: usize) -> Frame {
    Frame::from_fn(width, height, 0.0, |x, y| {
        let v = ((x * 11) ^ (y * 3) ^ (x * y)) & 0xFF;
        [v as u8, (v as u8).wrapping_mul(3), (x + y) as u8]
    })
    .unwrap()
}

fn check<K: Kernel>(frame: &Frame, plan: &TemplatePlan) {
    let serial = K::score_map(frame.view(), plan).unwrap();
    let parallel = score_map_par::<K>(frame.view(), plan).unwrap();
    assert_eq!(serial, parallel);

    let params = ScanParams {
        topk: 12,
        min_score: 0.2,
    };
    let serial = K::scan_full(frame.view(), plan, params).unwrap();
    let parallel = scan_full_par::<K>(frame.view(), plan, params).unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn parallel_scans_match_serial_scans() {
    let frame = make_frame(150, 110);
    let patch = frame.crop(&Region::new(47, 33, 30, 22).unwrap()).unwrap();
    let plan = TemplatePlan::from_view(patch.view()).unwrap();

    check::<SqdiffNormedScalar>(&frame, &plan);
    check::<CcorrNormedScalar>(&frame, &plan);
    check::<CcoeffNormedScalar>(&frame, &plan);
}

#[test]
fn parallel_scan_rejects_oversized_templates() {
    let frame = make_frame(20, 20);
    let big = make_frame(30, 10);
    let plan = TemplatePlan::from_view(big.view()).unwrap();
    assert!(score_map_par::<SqdiffNormedScalar>(frame.view(), &plan).is_err());
}
