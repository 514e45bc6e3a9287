//! Сопоставление последовательностей сегментов.
//!
//! `**` может поглотить любое число сегментов, поэтому жадное сравнение с
//! откатом на длинных ключах растёт экспоненциально. Вместо этого строится
//! таблица `dp[i][j]`: «суффикс `a[i..]` пересекается с суффиксом `b[j..]`».
//! Таблица заполняется с конца, хранится только текущая и следующая строка:
//! O(A·B) по времени и O(B) по памяти.

use super::Segment;

/// Пересекаются ли два выражения, то есть существует ли конкретный ключ,
/// подходящий под оба. Для конкретного `b` это обычное сопоставление
/// шаблона `a` с ключом `b`.
pub(crate) fn intersect(
    a: &[Segment],
    b: &[Segment],
) -> bool {
    let (la, lb) = (a.len(), b.len());

    // next = строка i + 1, cur = строка i
    let mut next = vec![false; lb + 1];
    let mut cur = vec![false; lb + 1];

    for i in (0..=la).rev() {
        for j in (0..=lb).rev() {
            cur[j] = if i == la && j == lb {
                true
            } else {
                cell(a, b, i, j, &cur, &next)
            };
        }
        std::mem::swap(&mut cur, &mut next);
    }

    // после последнего swap строка 0 лежит в `next`
    next[0]
}

#[inline]
fn cell(
    a: &[Segment],
    b: &[Segment],
    i: usize,
    j: usize,
    cur: &[bool],
    next: &[bool],
) -> bool {
    let sa = a.get(i);
    let sb = b.get(j);

    // `**` пуст, либо поглощает сегмент другой стороны и остаётся активным
    if sa == Some(&Segment::Multi) && (next[j] || (sb.is_some() && cur[j + 1])) {
        return true;
    }
    if sb == Some(&Segment::Multi) && (cur[j + 1] || (sa.is_some() && next[j])) {
        return true;
    }

    match (sa, sb) {
        (Some(x), Some(y)) if single_compatible(x, y) => next[j + 1],
        _ => false,
    }
}

/// Совместимы ли два однопозиционных сегмента.
fn single_compatible(
    x: &Segment,
    y: &Segment,
) -> bool {
    match (x, y) {
        (Segment::Literal(l), Segment::Literal(r)) => l == r,
        (Segment::Single, Segment::Literal(_))
        | (Segment::Literal(_), Segment::Single)
        | (Segment::Single, Segment::Single) => true,
        _ => false,
    }
}
